//! HTML templates using Askama.

use askama::Template;

use crate::domain::chart::{TIER_ORDER, tier_color};
use crate::domain::dataset::DatasetKind;
use crate::domain::query::ClassifiedMeta;

pub struct TierSwatch {
    pub tier: &'static str,
    pub color: &'static str,
}

pub fn tier_swatches() -> Vec<TierSwatch> {
    TIER_ORDER
        .iter()
        .map(|&tier| TierSwatch {
            tier,
            color: tier_color(tier),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate<'a> {
    pub meta: &'a ClassifiedMeta,
    pub session: &'a str,
    pub kinds: &'a [DatasetKind],
    pub tiers: Vec<TierSwatch>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}
