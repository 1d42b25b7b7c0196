pub mod account;
pub mod context;
pub mod error;
pub mod metrics;
pub mod name_match;
pub mod repository;
pub mod resolver;

pub use account::AccountService;
pub use context::RequestContext;
pub use error::ServiceError;
pub use metrics::{get_metrics, init_metrics};
pub use repository::{InMemoryUserRepository, PgUserRepository, RepositoryError, UserRepository};
pub use resolver::{AccountResolver, PaystackClient, ResolveError, ResolvedAccount};
