pub mod config;
pub mod fetcher;
pub mod identity;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod writer;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, FetcherConfig,
    SanitizedConfig, ServerConfig, StoreConfig,
};
pub use fetcher::{
    CountExtractor, FetchError, Fetcher, HttpTransport, MarkerPatternExtractor, ProfileFetcher,
    ReqwestTransport, TransportError,
};
pub use identity::{
    pick_egress, pick_identity, EgressPool, EgressRoute, IdentityPool, IdentityProfile,
    FALLBACK_USER_AGENT,
};
pub use registry::{RegistryError, Target, TargetRegistry, TargetSet};
pub use scheduler::{
    Job, JobContext, JobState, JobStatus, PollScheduler, RefreshSummary, SchedulerConfig,
    SchedulerError, SchedulerStatus, TickOutcome,
};
pub use store::RedisStore;
pub use writer::{FollowerCount, ResultWriter, WriteError};
