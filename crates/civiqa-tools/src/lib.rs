//! Structured query tools over the civic datasets.
//!
//! Each dataset is owned by a [`DataDomain`] implementation that exposes
//! its tools to the agent loop: homicide records, ACS census demographics,
//! socioeconomic indicators, and Cook County property sales. The
//! [`ToolRegistry`] owns the domains and routes calls by globally unique
//! tool name.
//!
//! Tool misuse never raises: a missing parameter, a bad value, or an
//! unknown tool name comes back as a reportable
//! [`ToolOutcome`](civiqa_models::ToolOutcome) so the agent loop can show
//! the LLM what went wrong and let it correct course.

pub mod areas;
pub mod census;
pub mod domain;
pub mod homicides;
pub mod params;
pub mod property;
pub mod registry;
pub mod socioeconomic;
pub mod test_support;

pub use census::CensusDomain;
pub use domain::{DataDomain, DatasetCell};
pub use homicides::HomicideDomain;
pub use property::PropertyDomain;
pub use registry::{RegistryError, ToolRegistry};
pub use socioeconomic::SocioeconomicDomain;
