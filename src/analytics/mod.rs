/// Seat-history analytics engine
///
/// Everything in here is synchronous and side-effect-free: the engine is
/// handed fully materialized `Show` / `SeatHistoryRecord` collections and
/// returns fresh values. "No data" degrades to empty results or `None`,
/// never an error.

pub mod dates;
pub mod forecast;
pub mod period;
pub mod rate;
pub mod reconstruct;
pub mod regression;
pub mod reports;

pub use dates::parse_show_date;
pub use forecast::forecast_sold_out;
pub use period::filter_by_period;
pub use rate::estimate_sales_rate;
pub use reconstruct::sales_and_returns;
pub use reports::{
    calendar_pace, show_financial_summary, soonest_sold_out, top_artists_by_sales,
    top_shows_by_return_rate, top_shows_by_returns, top_shows_by_sales,
    top_shows_by_sales_detailed, top_shows_by_sales_velocity, CalendarPace, FinancialSummary,
};
