use crate::decision::{format_decision, Decision};
use crate::error::ScreeningError;
use crate::models::ScreeningOptions;
use crate::screening::rank_candidates;
use crate::store::RecordStore;

/// Owns the session's record store and answers screening requests against it.
pub struct ScreeningCoordinator {
    store: RecordStore,
    options: ScreeningOptions,
}

impl ScreeningCoordinator {
    pub fn new(store: RecordStore, options: ScreeningOptions) -> Result<Self, ScreeningError> {
        if options.threshold > 100 {
            return Err(ScreeningError::InvalidThreshold(options.threshold));
        }
        if options.limit == 0 {
            return Err(ScreeningError::InvalidLimit);
        }

        Ok(Self { store, options })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn options(&self) -> ScreeningOptions {
        self.options
    }

    pub fn screen(&self, query: &str) -> Result<Decision, ScreeningError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScreeningError::EmptyQuery);
        }

        let ranked = rank_candidates(query, &self.store, self.options.limit);
        Ok(format_decision(query, ranked, self.options.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::MatchStatus;

    fn coordinator() -> ScreeningCoordinator {
        ScreeningCoordinator::new(RecordStore::seed(), ScreeningOptions::default())
            .expect("default options are valid")
    }

    #[test]
    fn blank_query_is_rejected_before_screening() {
        let coordinator = coordinator();
        assert_eq!(coordinator.screen("   ").err(), Some(ScreeningError::EmptyQuery));
        assert_eq!(coordinator.store().len(), 7);
    }

    #[test]
    fn alias_overlap_is_a_match() {
        let decision = coordinator()
            .screen("Siraj Haqqani")
            .expect("query is not empty");

        assert_eq!(decision.status, MatchStatus::Match);
        assert_eq!(
            decision.top_match.map(|record| record.reference_no),
            Some("TAi.144".to_string())
        );
    }

    #[test]
    fn query_is_trimmed_in_the_decision() {
        let decision = coordinator()
            .screen("  Ri Won Ho \n")
            .expect("query is not empty");
        assert_eq!(decision.query, "Ri Won Ho");
    }

    #[test]
    fn invalid_options_are_rejected() {
        let threshold = ScreeningOptions {
            threshold: 101,
            ..ScreeningOptions::default()
        };
        assert!(matches!(
            ScreeningCoordinator::new(RecordStore::seed(), threshold),
            Err(ScreeningError::InvalidThreshold(101))
        ));

        let limit = ScreeningOptions {
            limit: 0,
            ..ScreeningOptions::default()
        };
        assert!(matches!(
            ScreeningCoordinator::new(RecordStore::seed(), limit),
            Err(ScreeningError::InvalidLimit)
        ));
    }
}
