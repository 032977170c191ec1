//! Pattern-based error classification.

mod classifier;
mod pattern;
mod stats;

pub use classifier::Classification;
pub use classifier::Classifier;
pub use classifier::ClassifierConfig;
pub use pattern::ErrorPattern;
pub use pattern::Matcher;
pub use pattern::PatternBuilder;
pub use pattern::PatternVerdict;
pub use pattern::WeightedMatcher;
pub use pattern::default_patterns;
pub use stats::ClassifierStats;
pub use stats::StatsSnapshot;
pub use stats::StrategyRate;
pub use stats::TrendBucket;
