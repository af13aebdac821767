//! Static report catalog.
//!
//! Every pipeline variant is a fixed, ordered list of [`ReportSpec`]s. The
//! catalog is read-only after startup; the pipeline generates reports strictly
//! in the order listed here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One artifact to produce for every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Unique key within a variant; also the artifact file stem.
    pub report_type: String,
    pub title: String,
    /// Topic codes whose responses are relevant. Empty means all topics.
    #[serde(default)]
    pub category_focus: Vec<String>,
    /// Section headings passed through to formatting.
    #[serde(default)]
    pub sections: Vec<String>,
}

impl ReportSpec {
    pub fn new(report_type: &str, title: &str, category_focus: &[&str], sections: &[&str]) -> Self {
        Self {
            report_type: report_type.to_string(),
            title: title.to_string(),
            category_focus: category_focus.iter().map(|s| s.to_string()).collect(),
            sections: sections.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns true if a response tagged with `topic` belongs in this report.
    pub fn focuses_on(&self, topic: &str) -> bool {
        self.category_focus.is_empty()
            || self
                .category_focus
                .iter()
                .any(|code| code.eq_ignore_ascii_case(topic))
    }
}

struct CatalogEntry {
    report_type: &'static str,
    title: &'static str,
    focus: &'static [&'static str],
    sections: &'static [&'static str],
}

const EXECUTIVE_SUMMARY: CatalogEntry = CatalogEntry {
    report_type: "executive_summary",
    title: "Executive Summary",
    focus: &[],
    sections: &["Overview", "Key Findings", "Priority Recommendations"],
};

const FINANCIAL_HEALTH: CatalogEntry = CatalogEntry {
    report_type: "financial_health",
    title: "Financial Health Assessment",
    focus: &["FIN"],
    sections: &["Revenue Profile", "Profitability", "Liquidity", "Recommendations"],
};

const CASH_FLOW_FORECAST: CatalogEntry = CatalogEntry {
    report_type: "cash_flow_forecast",
    title: "Cash Flow Outlook",
    focus: &["FIN"],
    sections: &["Current Position", "Twelve-Month Outlook", "Risks to Cash"],
};

const MARKET_POSITION: CatalogEntry = CatalogEntry {
    report_type: "market_position",
    title: "Market Position Analysis",
    focus: &["MKT", "CUS"],
    sections: &["Target Market", "Positioning", "Differentiators"],
};

const COMPETITIVE_LANDSCAPE: CatalogEntry = CatalogEntry {
    report_type: "competitive_landscape",
    title: "Competitive Landscape",
    focus: &["MKT"],
    sections: &["Competitor Map", "Relative Strengths", "Threats"],
};

const CUSTOMER_EXPERIENCE: CatalogEntry = CatalogEntry {
    report_type: "customer_experience",
    title: "Customer Experience Review",
    focus: &["CUS"],
    sections: &["Journey", "Satisfaction Signals", "Retention"],
};

const SALES_PIPELINE: CatalogEntry = CatalogEntry {
    report_type: "sales_pipeline",
    title: "Sales & Revenue Engine",
    focus: &["SALES"],
    sections: &["Pipeline Health", "Conversion", "Pricing"],
};

const MARKETING_STRATEGY: CatalogEntry = CatalogEntry {
    report_type: "marketing_strategy",
    title: "Marketing Strategy",
    focus: &["MKT"],
    sections: &["Channels", "Messaging", "Budget Allocation"],
};

const OPERATIONAL_EFFICIENCY: CatalogEntry = CatalogEntry {
    report_type: "operational_efficiency",
    title: "Operational Efficiency Review",
    focus: &["OPS"],
    sections: &["Processes", "Bottlenecks", "Automation Opportunities"],
};

const PEOPLE_AND_CULTURE: CatalogEntry = CatalogEntry {
    report_type: "people_and_culture",
    title: "People & Culture",
    focus: &["HR"],
    sections: &["Team Structure", "Capability Gaps", "Engagement"],
};

const TECHNOLOGY_STACK: CatalogEntry = CatalogEntry {
    report_type: "technology_stack",
    title: "Technology & Digital Maturity",
    focus: &["TECH"],
    sections: &["Current Systems", "Maturity Score", "Roadmap"],
};

const COMPLIANCE_REVIEW: CatalogEntry = CatalogEntry {
    report_type: "compliance_review",
    title: "Legal & Compliance Review",
    focus: &["LEG"],
    sections: &["Obligations", "Gaps", "Remediation"],
};

const RISK_ASSESSMENT: CatalogEntry = CatalogEntry {
    report_type: "risk_assessment",
    title: "Risk Assessment",
    focus: &["RISK", "LEG", "FIN"],
    sections: &["Risk Register", "Likelihood & Impact", "Mitigations"],
};

const SWOT_ANALYSIS: CatalogEntry = CatalogEntry {
    report_type: "swot_analysis",
    title: "SWOT Analysis",
    focus: &["STRAT", "MKT", "FIN", "OPS"],
    sections: &["Strengths", "Weaknesses", "Opportunities", "Threats"],
};

const GROWTH_OPPORTUNITIES: CatalogEntry = CatalogEntry {
    report_type: "growth_opportunities",
    title: "Growth Opportunities",
    focus: &["STRAT", "SALES", "MKT"],
    sections: &["Quick Wins", "Strategic Bets", "Sequencing"],
};

const INVESTOR_READINESS: CatalogEntry = CatalogEntry {
    report_type: "investor_readiness",
    title: "Investor Readiness",
    focus: &["FIN", "STRAT"],
    sections: &["Story", "Metrics", "Diligence Gaps"],
};

const ACTION_PLAN: CatalogEntry = CatalogEntry {
    report_type: "action_plan",
    title: "90-Day Action Plan",
    focus: &["STRAT", "OPS"],
    sections: &["First 30 Days", "Days 31-60", "Days 61-90", "Owners"],
};

const ESSENTIALS: &[CatalogEntry] = &[
    EXECUTIVE_SUMMARY,
    FINANCIAL_HEALTH,
    MARKET_POSITION,
    OPERATIONAL_EFFICIENCY,
    SWOT_ANALYSIS,
    GROWTH_OPPORTUNITIES,
    RISK_ASSESSMENT,
    ACTION_PLAN,
];

const FULL: &[CatalogEntry] = &[
    EXECUTIVE_SUMMARY,
    FINANCIAL_HEALTH,
    CASH_FLOW_FORECAST,
    MARKET_POSITION,
    COMPETITIVE_LANDSCAPE,
    CUSTOMER_EXPERIENCE,
    SALES_PIPELINE,
    MARKETING_STRATEGY,
    OPERATIONAL_EFFICIENCY,
    PEOPLE_AND_CULTURE,
    TECHNOLOGY_STACK,
    COMPLIANCE_REVIEW,
    RISK_ASSESSMENT,
    SWOT_ANALYSIS,
    GROWTH_OPPORTUNITIES,
    INVESTOR_READINESS,
    ACTION_PLAN,
];

/// Which fixed report set a worker generates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    #[default]
    Essentials,
    Full,
}

impl PipelineVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineVariant::Essentials => "essentials",
            PipelineVariant::Full => "full",
        }
    }

    /// The ordered report specs for this variant.
    pub fn specs(&self) -> Vec<ReportSpec> {
        let entries = match self {
            PipelineVariant::Essentials => ESSENTIALS,
            PipelineVariant::Full => FULL,
        };
        entries
            .iter()
            .map(|e| ReportSpec::new(e.report_type, e.title, e.focus, e.sections))
            .collect()
    }
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "essentials" => Ok(PipelineVariant::Essentials),
            "full" => Ok(PipelineVariant::Full),
            other => Err(ConfigError::UnknownPipeline(other.to_string())),
        }
    }
}
