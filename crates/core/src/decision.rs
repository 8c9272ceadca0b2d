use crate::models::SanctionRecord;
use crate::screening::ScreeningHit;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const REGULATORY_CITATION: &str = "Pursuant to AMLA 2001 & Strategic Trade Act 2010.";

const REPORTING_INSTITUTION: &str = "Company Secretary Firm";
const SCREENER: &str = "Compliance Officer";

const MATCH_ACTIONS: [&str; 4] = [
    "FREEZE: Immediately freeze funds, properties, or assets. Do not process the transaction.",
    "BLOCK: Prevent the individual/entity from accessing services.",
    "REPORT: Submit a Suspicious Transaction Report (STR) to Bank Negara Malaysia (FIED).",
    "NOTIFY: Inform the Inspector-General of Police (IGP).",
];

const NO_MATCH_ACTIONS: [&str; 3] = [
    "Proceed with standard ID verification (NRIC/Passport).",
    "Conduct beneficial ownership checks.",
    "Archive this search result for audit trail.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStatus {
    Match,
    NoMatch,
}

pub fn is_high_risk(score: u8, threshold: u8) -> bool {
    score >= threshold
}

#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub query: String,
    pub threshold: u8,
    pub status: MatchStatus,
    /// Every ranked candidate, including those below the threshold.
    pub ranked: Vec<ScreeningHit>,
    /// Records at or above the threshold, in rank order.
    pub matches: Vec<SanctionRecord>,
    pub top_match: Option<SanctionRecord>,
}

pub fn format_decision(query: &str, ranked: Vec<ScreeningHit>, threshold: u8) -> Decision {
    let matches = ranked
        .iter()
        .filter(|hit| is_high_risk(hit.score, threshold))
        .map(|hit| hit.record.clone())
        .collect::<Vec<_>>();
    let top_match = matches.first().cloned();
    let status = if top_match.is_some() {
        MatchStatus::Match
    } else {
        MatchStatus::NoMatch
    };

    Decision {
        query: query.to_string(),
        threshold,
        status,
        ranked,
        matches,
        top_match,
    }
}

/// A downloadable text artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportExport {
    pub file_name: &'static str,
    pub body: String,
}

impl Decision {
    pub fn is_match(&self) -> bool {
        self.status == MatchStatus::Match
    }

    pub fn high_risk_hits(&self) -> impl Iterator<Item = &ScreeningHit> {
        let threshold = self.threshold;
        self.ranked
            .iter()
            .filter(move |hit| is_high_risk(hit.score, threshold))
    }

    pub fn required_actions(&self) -> &'static [&'static str] {
        match self.status {
            MatchStatus::Match => &MATCH_ACTIONS,
            MatchStatus::NoMatch => &NO_MATCH_ACTIONS,
        }
    }

    /// Suspicious transaction report draft for the top match.
    pub fn str_report(&self, generated_at: DateTime<Utc>) -> Option<String> {
        let subject = self.top_match.as_ref()?;
        let lines = [
            "SUSPICIOUS TRANSACTION REPORT (DRAFT)".to_string(),
            "-------------------------------------".to_string(),
            format!("Date: {}", timestamp(generated_at)),
            format!("Reporting Institution: {REPORTING_INSTITUTION}"),
            String::new(),
            "SUBJECT DETAILS".to_string(),
            "---------------".to_string(),
            format!("Name Match: {}", subject.name),
            format!("Reference No: {}", subject.reference_no),
            format!("Source List: {}", subject.source),
            format!("Nationality: {}", subject.nationality),
            String::new(),
            "REASON FOR SUSPICION".to_string(),
            "--------------------".to_string(),
            format!("Screened name: {}", self.query),
            "Positive match found against Sanctions List.".to_string(),
            "Asset freezing measures initiated immediately.".to_string(),
            String::new(),
            REGULATORY_CITATION.to_string(),
        ];
        Some(lines.join("\n") + "\n")
    }

    /// Audit certificate recording that a search found nothing.
    pub fn no_match_certificate(&self, generated_at: DateTime<Utc>) -> Option<String> {
        if self.is_match() {
            return None;
        }
        let lines = [
            "SANCTIONS SCREENING CERTIFICATE".to_string(),
            format!("Search Term: {}", self.query),
            format!("Date: {}", timestamp(generated_at)),
            "Result: No Match".to_string(),
            format!("Screener: {SCREENER}"),
            REGULATORY_CITATION.to_string(),
        ];
        Some(lines.join("\n") + "\n")
    }

    pub fn export(&self, generated_at: DateTime<Utc>) -> ReportExport {
        match self.str_report(generated_at) {
            Some(body) => ReportExport {
                file_name: "STR_Draft_Report.txt",
                body,
            },
            None => ReportExport {
                file_name: "search_certificate.txt",
                body: self.no_match_certificate(generated_at).unwrap_or_default(),
            },
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Internal compliance log entry opened when an officer records a match.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceCase {
    pub case_id: Uuid,
    pub opened_at: DateTime<Utc>,
    pub query: String,
    pub reference_no: String,
    pub source: String,
    pub match_count: usize,
}

impl ComplianceCase {
    pub fn open(decision: &Decision, opened_at: DateTime<Utc>) -> Option<Self> {
        let top = decision.top_match.as_ref()?;
        Some(Self {
            case_id: Uuid::new_v4(),
            opened_at,
            query: decision.query.clone(),
            reference_no: top.reference_no.clone(),
            source: top.source.label().to_string(),
            match_count: decision.matches.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed_records;
    use chrono::TimeZone;

    fn hit(position: usize, score: u8) -> ScreeningHit {
        ScreeningHit {
            position,
            score,
            record: seed_records()[position].clone(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn score_at_threshold_is_a_match() {
        let decision = format_decision("q", vec![hit(4, 80), hit(3, 79)], 80);

        assert_eq!(decision.status, MatchStatus::Match);
        assert_eq!(decision.matches.len(), 1);
        assert_eq!(decision.top_match.as_ref().map(|r| r.reference_no.as_str()), Some("TAi.173"));
        assert_eq!(decision.ranked.len(), 2);
    }

    #[test]
    fn score_below_threshold_is_no_match() {
        let decision = format_decision("q", vec![hit(3, 79)], 80);

        assert_eq!(decision.status, MatchStatus::NoMatch);
        assert!(decision.matches.is_empty());
        assert!(decision.top_match.is_none());
        assert_eq!(decision.high_risk_hits().count(), 0);
    }

    #[test]
    fn str_report_carries_subject_fields_in_order() {
        let decision = format_decision("Abdul Basir Noorzai", vec![hit(4, 100)], 80);
        let report = decision.str_report(at()).expect("match has a report");

        let positions = [
            "SUSPICIOUS TRANSACTION REPORT (DRAFT)",
            "Date: 2025-03-14 09:30:00 UTC",
            "Name Match: ABDUL BASIR NOORZAI",
            "Reference No: TAi.173",
            "Source List: UNSCR 1988 (Taliban)",
            "Nationality: Afghanistan",
            REGULATORY_CITATION,
        ]
        .iter()
        .map(|needle| report.find(needle).expect("field present"))
        .collect::<Vec<_>>();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(decision.str_report(at()), Some(report));
        assert!(decision.no_match_certificate(at()).is_none());
    }

    #[test]
    fn certificate_only_for_no_match() {
        let decision = format_decision("John Smith", vec![hit(0, 20)], 80);
        let export = decision.export(at());

        assert_eq!(export.file_name, "search_certificate.txt");
        assert!(export.body.contains("Search Term: John Smith"));
        assert!(export.body.contains("Result: No Match"));
        assert!(export.body.contains(REGULATORY_CITATION));
        assert_eq!(decision.required_actions().len(), 3);
    }

    #[test]
    fn cases_open_only_for_matches() {
        let matched = format_decision("q", vec![hit(6, 92)], 80);
        let case = ComplianceCase::open(&matched, at()).expect("match opens a case");
        assert_eq!(case.reference_no, "IRi.039");
        assert_eq!(case.match_count, 1);

        let clear = format_decision("q", vec![hit(6, 10)], 80);
        assert!(ComplianceCase::open(&clear, at()).is_none());
    }

    #[test]
    fn decision_serializes_for_the_cli() {
        let decision = format_decision("Abdul Basir Noorzai", vec![hit(4, 100)], 80);
        let json = serde_json::to_value(&decision).expect("decision serializes");

        assert_eq!(json["status"], "Match");
        assert_eq!(json["ranked"][0]["score"], 100);
        assert_eq!(json["top_match"]["reference_no"], "TAi.173");
    }
}
