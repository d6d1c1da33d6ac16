//! 분석 파이프라인을 위한 도메인 모델.

mod price;
mod provider;
mod signal;
mod trade;
mod watchlist;

pub use price::*;
pub use provider::*;
pub use signal::*;
pub use trade::*;
pub use watchlist::*;
