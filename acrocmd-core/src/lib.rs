pub mod batch;
pub mod check;
pub mod config;
pub mod crawler;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod window;

pub use batch::{BatchChecker, Checker};
pub use check::{CheckItem, CheckItemId, CheckItemState, CheckOptions, QualityStatus, Report, ReportType};
pub use config::Config;
pub use crawler::{Crawler, DirectoryCrawler, FileCrawler, ReferencePattern};
pub use endpoint::{AcrolinxEndpoint, CheckingCapabilities, CheckingEndpoint, ClientInfo};
pub use error::{CommanderError, Result};
pub use events::{CheckerEvent, EventBus, Subscription, SubscriptionId};
pub use window::WindowedList;
