//! EMCAL track-selection bookkeeping.

pub mod track_sel;

pub use track_sel::{TrackSelResultCombined, TrackSelResultPtr, TrackSelResultUserInfo};
