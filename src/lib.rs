pub mod acceptance;
pub mod candidates;
pub mod config;
pub mod error;
pub mod parameter_set;
pub mod ranking;
pub mod search;
pub mod security_level;


pub use acceptance::{AcceptanceCriteria, Limits, Predicate, Rejection};
pub use candidates::{inclusive_range, Candidates, SearchSpace};
pub use config::SearchProfile;
pub use error::{Result, SearchError};
pub use parameter_set::{ParameterSet, MAX_FORS_HEIGHT, MAX_LAYER_HEIGHT, MAX_LG_W};
pub use ranking::{BoundedRanking, Ranking, SigningCost, WeightedCost};
pub use search::{search, RankedResult, SearchConfig, SearchEngine};
pub use security_level::{meets_security_level, security_level, signatures_at_level};
