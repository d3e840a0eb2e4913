pub mod adapters;
pub mod aggregator;
pub mod dashboard;
pub mod funfact;
pub mod orchestrator;
pub mod scheduler;
pub mod steps;
pub mod summary;
pub mod widget;

pub use adapters::{
    CalendarAdapter, FunFactAdapter, NewsAdapter, RefreshContext, SourceAdapter, SourceKind,
    StepsAdapter, WeatherAdapter,
};
pub use aggregator::{Aggregator, AggregatorHandle, AggregatorInputs, Loadable, ViewState};
pub use dashboard::{adapters_from_config, Dashboard, Stores};
pub use funfact::{fallback_fact, FunFactClient, FunFactError, FunFactHolder};
pub use orchestrator::{classify, AdapterOutcome, RefreshOrchestrator, RefreshOutcome, RefreshReport};
pub use scheduler::{RefreshPolicy, RefreshScheduler};
pub use steps::{start_of_day, NoHealthAccess, StepsError, StepsHolder, StepsReading, StepsSource};
pub use summary::{compose, SummaryInputs};
pub use widget::{read_widget_snapshot, WidgetSnapshot, WidgetWeather, WIDGET_PLACEHOLDER};
