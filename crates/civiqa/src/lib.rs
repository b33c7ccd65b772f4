//! CIVIQA - Civic Question Answering
//!
//! Answers natural-language questions about Chicago civic data by pairing
//! a Gemini model with structured query tools over homicide records,
//! census demographics, socioeconomic indicators, and Cook County
//! property sales.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use civiqa::models::CiviqaConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = CiviqaConfig::default();
//! let engine = civiqa::build_engine(&config).await?;
//! let report = engine.answer("How many homicides were there in 2023?").await?;
//! println!("{}", report.answer);
//! # Ok(())
//! # }
//! ```

pub use civiqa_agent as agent;
pub use civiqa_cache as cache;
pub use civiqa_fetcher as fetcher;
pub use civiqa_models as models;
pub use civiqa_tools as tools;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use civiqa_agent::{AgentError, GeminiConfig, GeminiHttp, Orchestrator};
use civiqa_cache::{CacheReader, SqliteReader};
use civiqa_fetcher::{DatasetService, DomainSource, SocrataClient, SqliteWriter};
use civiqa_models::{AnswerReport, CiviqaConfig, DomainId};
use civiqa_tools::{
    CensusDomain, DataDomain, DatasetCell, HomicideDomain, PropertyDomain, SocioeconomicDomain,
    ToolRegistry,
};
use tracing::{info, warn};

/// Pause between portal pages when the engine has to fetch cold.
const FETCH_PACING: Duration = Duration::from_millis(500);

/// A ready-to-ask question answering engine.
pub struct Engine {
    orchestrator: Orchestrator,
}

impl Engine {
    /// Answer one question, returning the full report with its run trace.
    pub async fn answer(&self, question: &str) -> Result<AnswerReport, AgentError> {
        self.orchestrator.answer_question(question).await
    }
}

/// Build an [`Engine`] from configuration.
///
/// Datasets are served from the shared snapshot cache; a missing or
/// expired snapshot is fetched from the portal on the spot. A domain
/// whose dataset cannot be loaded at all is still registered over an
/// empty dataset, so its tools stay visible and report the data as
/// unavailable instead of silently vanishing.
pub async fn build_engine(config: &CiviqaConfig) -> Result<Engine, anyhow::Error> {
    // Writer opens first so the schema exists before the read-only side
    // attaches to the same file.
    let writer = SqliteWriter::open(&config.cache.sqlite_path)?;
    let sqlite = SqliteReader::open(&config.cache.sqlite_path)?;
    let reader = Arc::new(CacheReader::new(
        sqlite,
        config.cache.memory_max_capacity,
        Duration::from_secs(config.cache.memory_ttl_seconds),
    ));

    let portal = Arc::new(SocrataClient::new()?);
    let sources: Vec<DomainSource> = DomainId::ALL.iter().map(|d| DomainSource::builtin(*d)).collect();
    let service = DatasetService::new(
        portal,
        reader,
        Arc::new(Mutex::new(writer)),
        sources,
        FETCH_PACING,
    );

    let registry = load_registry(&service).await?;

    let model = GeminiHttp::new(GeminiConfig::from_agent(&config.agent))?;
    let orchestrator = Orchestrator::new(
        Arc::new(model),
        Arc::new(registry),
        config.agent.clone(),
    );

    Ok(Engine { orchestrator })
}

/// Register every domain over whatever dataset the service can provide
/// right now.
async fn load_registry(service: &DatasetService) -> Result<ToolRegistry, anyhow::Error> {
    let mut registry = ToolRegistry::new();
    for domain in DomainId::ALL {
        let cell = match service.ensure(domain).await {
            Ok(dataset) => {
                info!(domain = %domain, rows = dataset.len(), "dataset ready");
                Arc::new(DatasetCell::new(dataset))
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "dataset unavailable, registering empty");
                Arc::new(DatasetCell::empty(domain))
            }
        };
        let handler: Arc<dyn DataDomain> = match domain {
            DomainId::Homicides => Arc::new(HomicideDomain::new(cell)),
            DomainId::Census => Arc::new(CensusDomain::new(cell)),
            DomainId::Socioeconomic => Arc::new(SocioeconomicDomain::new(cell)),
            DomainId::PropertySales => Arc::new(PropertyDomain::new(cell)),
        };
        registry.register_domain(handler)?;
    }
    Ok(registry)
}
