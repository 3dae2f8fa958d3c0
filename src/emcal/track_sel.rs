use std::ops::Index;

use crate::errors::IndexError;

/// Optional annotation attached by a track selection (e.g. the name of the
/// cut that rejected the track).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackSelResultUserInfo {
    pub name: String,
}

/// Result of one track selection applied to one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSelResultPtr {
    /// Index of the track in its event, if any.
    pub track: Option<usize>,
    pub selected: bool,
    pub user_info: Option<TrackSelResultUserInfo>,
}

impl TrackSelResultPtr {
    pub fn new(track: Option<usize>, selected: bool) -> Self {
        TrackSelResultPtr {
            track,
            selected,
            user_info: None,
        }
    }

    pub fn with_user_info(mut self, info: TrackSelResultUserInfo) -> Self {
        self.user_info = Some(info);
        self
    }
}

/// Owned collection of the results of several selections for the same track.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackSelResultCombined {
    data: Vec<TrackSelResultPtr>,
}

impl TrackSelResultCombined {
    /// Combine copies of the individual selection results.
    pub fn new(single_results: &[TrackSelResultPtr]) -> Self {
        TrackSelResultCombined {
            data: single_results.to_vec(),
        }
    }

    /// Bounds-checked access.
    pub fn get(&self, index: i64) -> Result<&TrackSelResultPtr, IndexError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.data.get(i))
            .ok_or(IndexError(index))
    }

    pub fn number_of_selection_results(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackSelResultPtr> {
        self.data.iter()
    }
}

impl Index<usize> for TrackSelResultCombined {
    type Output = TrackSelResultPtr;

    /// Panics with the [`IndexError`] message when out of range.
    fn index(&self, index: usize) -> &Self::Output {
        match self.data.get(index) {
            Some(r) => r,
            None => panic!("{}", IndexError(index as i64)),
        }
    }
}

impl<'a> IntoIterator for &'a TrackSelResultCombined {
    type Item = &'a TrackSelResultPtr;
    type IntoIter = std::slice::Iter<'a, TrackSelResultPtr>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrackSelResultCombined {
        let info = TrackSelResultUserInfo {
            name: "hybrid".to_string(),
        };
        TrackSelResultCombined::new(&[
            TrackSelResultPtr::new(Some(4), true),
            TrackSelResultPtr::new(Some(4), false).with_user_info(info),
        ])
    }

    #[test]
    fn indexes_within_bounds() {
        let combined = sample();
        assert_eq!(combined.number_of_selection_results(), 2);
        assert!(combined.get(0).unwrap().selected);
        assert_eq!(combined[1].user_info.as_ref().unwrap().name, "hybrid");
        assert_eq!(combined.iter().filter(|r| r.selected).count(), 1);
    }

    #[test]
    fn rejects_out_of_range() {
        let combined = sample();
        assert_eq!(combined.get(-1), Err(IndexError(-1)));
        assert_eq!(combined.get(2), Err(IndexError(2)));
        assert_eq!(TrackSelResultCombined::default().get(0), Err(IndexError(0)));
    }

    #[test]
    #[should_panic(expected = "index 5 out of range")]
    fn index_operator_panics() {
        let combined = sample();
        let _ = &combined[5];
    }

    #[test]
    fn holds_independent_copies() {
        let mut originals = vec![TrackSelResultPtr::new(Some(1), true)];
        let combined = TrackSelResultCombined::new(&originals);
        originals[0].selected = false;
        assert!(combined[0].selected);
    }
}
