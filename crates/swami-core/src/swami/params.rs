// Swami parameters: the two-layer (class defaults + instance overrides)
// configuration merged once before a swami is built.

use serde::Deserialize;

use crate::analysis::filter::FilterDescriptor;

/// Every key a swami class or instance may set. All optional: a class supplies
/// defaults, an instance overrides any subset. Unknown keys are rejected so a
/// misspelled override cannot silently leave the class value in force.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwamiParams {
    pub strategy: Option<String>,
    pub about_me: Option<String>,
    pub num_games: Option<u32>,
    pub num_seasons: Option<u32>,
    pub criteria: Option<Vec<String>>,
    pub filters: Option<Vec<FilterDescriptor>>,
    pub tie_break: Option<String>,
}

impl SwamiParams {
    /// Overlay `self` on `base`: each key takes this value when set, otherwise
    /// the base value. Lists replace rather than append.
    pub fn merged_over(&self, base: &SwamiParams) -> SwamiParams {
        SwamiParams {
            strategy: self.strategy.clone().or_else(|| base.strategy.clone()),
            about_me: self.about_me.clone().or_else(|| base.about_me.clone()),
            num_games: self.num_games.or(base.num_games),
            num_seasons: self.num_seasons.or(base.num_seasons),
            criteria: self.criteria.clone().or_else(|| base.criteria.clone()),
            filters: self.filters.clone().or_else(|| base.filters.clone()),
            tie_break: self.tie_break.clone().or_else(|| base.tie_break.clone()),
        }
    }
}
