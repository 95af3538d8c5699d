use chrono::NaiveDateTime;
use thiserror::Error;

/// A named release target with a due date, as tracked by the issue tracker.
///
/// Due dates are normalized to end-of-day (23:59:59) so a build produced on
/// the due date itself still falls before the milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub name: String,
    pub due: NaiveDateTime,
}

#[derive(Error, Debug)]
pub enum MatchError {
    /// Every milestone is already due; there is nothing the next build
    /// could be targeting.
    #[error("No milestone is due after the latest build ({latest_build})")]
    NoUpcomingRelease { latest_build: NaiveDateTime },
}

/// Find the release the next build is targeting: the milestone with the
/// smallest due date strictly after the latest build's timestamp.
pub fn match_release(
    milestones: &[Milestone],
    latest_build: NaiveDateTime,
) -> Result<&Milestone, MatchError> {
    milestones
        .iter()
        .filter(|m| m.due > latest_build)
        .min_by_key(|m| m.due)
        .ok_or(MatchError::NoUpcomingRelease { latest_build })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
    }

    fn milestone(name: &str, due: NaiveDateTime) -> Milestone {
        Milestone {
            name: name.to_string(),
            due,
        }
    }

    #[test]
    fn picks_first_milestone_due_after_latest_build() {
        // Builds on 2023-01-01, 02-01 and 03-01 (latest); R1 was due before
        // the latest build, so the next build targets R2.
        let milestones = vec![
            milestone("R1", day(2023, 2, 15)),
            milestone("R2", day(2023, 4, 10)),
        ];
        let latest_build = day(2023, 3, 1);

        let matched = match_release(&milestones, latest_build).unwrap();
        assert_eq!(matched.name, "R2");
    }

    #[test]
    fn picks_smallest_qualifying_due_date_regardless_of_input_order() {
        let milestones = vec![
            milestone("R3", day(2023, 6, 1)),
            milestone("R2", day(2023, 4, 10)),
            milestone("R1", day(2023, 2, 15)),
        ];

        let matched = match_release(&milestones, day(2023, 3, 1)).unwrap();
        assert_eq!(matched.name, "R2");
    }

    #[test]
    fn due_date_equal_to_build_timestamp_does_not_match() {
        let due = day(2023, 4, 10);
        let milestones = vec![milestone("R1", due)];

        let err = match_release(&milestones, due).unwrap_err();
        assert!(matches!(err, MatchError::NoUpcomingRelease { .. }));
    }

    #[test]
    fn all_milestones_already_due_is_an_error() {
        let milestones = vec![
            milestone("R1", day(2022, 11, 1)),
            milestone("R2", day(2023, 1, 15)),
        ];

        let err = match_release(&milestones, day(2023, 3, 1)).unwrap_err();
        assert!(matches!(err, MatchError::NoUpcomingRelease { .. }));
    }

    #[test]
    fn no_milestones_is_an_error() {
        let err = match_release(&[], day(2023, 3, 1)).unwrap_err();
        assert!(matches!(err, MatchError::NoUpcomingRelease { .. }));
    }
}
