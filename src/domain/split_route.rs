//! Split-Route Calculator
//!
//! Decides how much of a trade each venue should take. Every venue has its
//! own diminishing-returns curve, so moving volume from a deep venue to a
//! shallower one can still improve the blended output once the deep venue's
//! marginal rate drops below the shallow one's.
//!
//! Allocation is exact water-filling in `resolution_bps` chunks for every
//! venue subset within `max_splits`; the best subset wins, with ties inside
//! `tie_epsilon_bps` resolved toward fewer venues.

use serde::{Deserialize, Serialize};

use super::error::RoutingError;
use super::quote::Quote;
use super::venue::Venue;

/// Maximum venues in one split
pub const DEFAULT_MAX_SPLITS: usize = 4;

/// Minimum share of the trade any included venue must take
pub const DEFAULT_MIN_SPLIT_PERCENT: u8 = 5;

/// Below this USD size a single venue is always used
pub const DEFAULT_MIN_AMOUNT_USD_FOR_SPLIT: f64 = 100.0;

/// Allocation granularity (1% of the trade)
pub const DEFAULT_RESOLUTION_BPS: u16 = 100;

/// Output difference treated as a tie
pub const DEFAULT_TIE_EPSILON_BPS: u16 = 1;

/// Venues beyond this many (ranked by single-venue output) are not considered
const MAX_CANDIDATE_VENUES: usize = 8;

const TOTAL_BPS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitRouteConfig {
    pub enabled: bool,
    pub max_splits: usize,
    pub min_split_percent: u8,
    pub min_amount_usd_for_split: f64,
    pub resolution_bps: u16,
    pub tie_epsilon_bps: u16,
}

impl Default for SplitRouteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_splits: DEFAULT_MAX_SPLITS,
            min_split_percent: DEFAULT_MIN_SPLIT_PERCENT,
            min_amount_usd_for_split: DEFAULT_MIN_AMOUNT_USD_FOR_SPLIT,
            resolution_bps: DEFAULT_RESOLUTION_BPS,
            tie_epsilon_bps: DEFAULT_TIE_EPSILON_BPS,
        }
    }
}

/// Per-call split constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    pub max_splits: usize,
    pub min_split_percent: u8,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            max_splits: DEFAULT_MAX_SPLITS,
            min_split_percent: DEFAULT_MIN_SPLIT_PERCENT,
        }
    }
}

/// Output curve of one venue: `out(x) = spot * x * (1 - k * x)`.
///
/// Marginal output `spot * (1 - 2kx)` strictly decreases with volume.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueCurve {
    pub venue: Venue,
    /// Output per input unit at zero size
    pub spot_rate: f64,
    /// Fractional price impact per input unit
    pub impact_per_unit: f64,
    /// Largest input the venue can take, if bounded
    pub capacity: Option<u64>,
}

impl VenueCurve {
    pub fn new(venue: Venue, spot_rate: f64, impact_per_unit: f64) -> Self {
        Self {
            venue,
            spot_rate,
            impact_per_unit: impact_per_unit.max(0.0),
            capacity: None,
        }
    }

    /// Fit a curve through a venue's quote for `requested` input.
    ///
    /// A quote that consumed less than `requested` bounds the venue's capacity.
    pub fn from_quote(venue: Venue, quote: &Quote, requested: u64) -> Option<Self> {
        if quote.is_empty() {
            return None;
        }
        let in_amount = quote.in_amount as f64;
        let impact = (quote.price_impact_pct / 100.0).clamp(0.0, 0.99);
        let spot_rate = quote.out_amount as f64 / (in_amount * (1.0 - impact));
        let mut curve = Self::new(venue, spot_rate, impact / in_amount);
        if quote.in_amount < requested {
            curve.capacity = Some(quote.in_amount);
        }
        Some(curve)
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Expected output for `amount` input
    pub fn output_for(&self, amount: u64) -> f64 {
        let x = amount as f64;
        let impact = (self.impact_per_unit * x).min(1.0);
        self.spot_rate * x * (1.0 - impact)
    }

    fn can_take(&self, amount: u64) -> bool {
        self.capacity.map_or(true, |cap| amount <= cap)
    }

    fn max_fill(&self, amount: u64) -> u64 {
        self.capacity.map_or(amount, |cap| cap.min(amount))
    }

    fn is_viable(&self) -> bool {
        self.spot_rate > 0.0 && self.spot_rate.is_finite() && self.capacity != Some(0)
    }
}

/// One venue's share of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSplit {
    pub venue: Venue,
    /// Share of the routed amount; shares of one plan sum to 10000
    pub weight_bps: u16,
    pub input_amount: u64,
    pub expected_output: u64,
}

/// Result of an allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub splits: Vec<RouteSplit>,
    pub requested_amount: u64,
    /// Input actually routed; below `requested_amount` when no full route exists
    pub filled_amount: u64,
    pub total_output: u64,
    /// Output of the best single venue for the same request
    pub best_single_output: u64,
    pub improvement_vs_single_bps: i64,
}

impl SplitOutcome {
    pub fn is_full_fill(&self) -> bool {
        self.filled_amount >= self.requested_amount
    }

    pub fn shortfall(&self) -> u64 {
        self.requested_amount.saturating_sub(self.filled_amount)
    }

    pub fn is_split(&self) -> bool {
        self.splits.len() > 1
    }

    /// Surface a partial fill as `NoRouteFound`
    pub fn require_full(self) -> Result<Self, RoutingError> {
        if self.is_full_fill() {
            Ok(self)
        } else {
            Err(RoutingError::NoRouteFound {
                requested: self.requested_amount,
                fillable: self.filled_amount,
            })
        }
    }
}

/// One evaluated venue subset
#[derive(Debug, Clone)]
struct Candidate {
    members: Vec<usize>,
    inputs: Vec<u64>,
    filled: u64,
    output: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SplitRouteCalculator {
    config: SplitRouteConfig,
}

impl SplitRouteCalculator {
    pub fn new(config: SplitRouteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitRouteConfig {
        &self.config
    }

    /// Constraints from configuration
    pub fn options(&self) -> SplitOptions {
        SplitOptions {
            max_splits: self.config.max_splits,
            min_split_percent: self.config.min_split_percent,
        }
    }

    /// Splitting only pays off once the trade is large enough to move prices
    pub fn should_use_split_route(&self, trade_size_usd: f64) -> bool {
        self.config.enabled && trade_size_usd >= self.config.min_amount_usd_for_split
    }

    /// Allocate `trade_size` across the venues that quoted it
    pub fn compute_split<'a, I>(
        &self,
        quotes_by_venue: I,
        trade_size: u64,
        options: SplitOptions,
    ) -> Result<SplitOutcome, RoutingError>
    where
        I: IntoIterator<Item = (Venue, &'a Quote)>,
    {
        let curves: Vec<VenueCurve> = quotes_by_venue
            .into_iter()
            .filter_map(|(venue, quote)| VenueCurve::from_quote(venue, quote, trade_size))
            .collect();
        self.allocate(&curves, trade_size, options)
    }

    /// Allocate `trade_size` across explicit venue curves
    pub fn allocate(
        &self,
        curves: &[VenueCurve],
        trade_size: u64,
        options: SplitOptions,
    ) -> Result<SplitOutcome, RoutingError> {
        if trade_size == 0 {
            return Err(RoutingError::InvalidRequest("trade size must be > 0".into()));
        }

        let mut viable: Vec<&VenueCurve> = curves.iter().filter(|c| c.is_viable()).collect();
        if viable.is_empty() {
            return Err(RoutingError::NoRouteFound { requested: trade_size, fillable: 0 });
        }

        // Rank by what each venue returns on its own
        viable.sort_by(|a, b| {
            let out_a = a.output_for(a.max_fill(trade_size));
            let out_b = b.output_for(b.max_fill(trade_size));
            out_b.total_cmp(&out_a)
        });
        viable.truncate(MAX_CANDIDATE_VENUES);

        let best_single = self.best_single(&viable, trade_size);
        let max_splits = options.max_splits.max(1).min(viable.len());

        let chosen = if viable.len() < 2 || max_splits < 2 {
            best_single.clone()
        } else {
            let min_weight_bps = options.min_split_percent as u64 * 100;
            let mut candidates = Vec::new();
            for mask in 1u32..(1u32 << viable.len()) {
                if mask.count_ones() as usize > max_splits {
                    continue;
                }
                let members: Vec<usize> =
                    (0..viable.len()).filter(|i| mask & (1 << i) != 0).collect();
                if let Some(candidate) = self.water_fill(&viable, members, trade_size, min_weight_bps) {
                    candidates.push(candidate);
                }
            }
            self.pick(candidates).unwrap_or_else(|| best_single.clone())
        };

        let best_single_output = best_single.output.floor() as u64;
        Ok(self.build_outcome(&viable, chosen, trade_size, best_single_output))
    }

    fn best_single(&self, viable: &[&VenueCurve], trade_size: u64) -> Candidate {
        // `viable` is sorted by single-venue output, so the head is the best
        let curve = viable[0];
        let filled = curve.max_fill(trade_size);
        Candidate {
            members: vec![0],
            inputs: vec![filled],
            filled,
            output: curve.output_for(filled),
        }
    }

    /// Greedy chunk allocation by marginal output within one subset.
    ///
    /// Returns None when a member ends up unused or under the minimum weight,
    /// since a smaller subset covers that allocation.
    fn water_fill(
        &self,
        viable: &[&VenueCurve],
        members: Vec<usize>,
        trade_size: u64,
        min_weight_bps: u64,
    ) -> Option<Candidate> {
        let resolution = (self.config.resolution_bps as u64).clamp(1, TOTAL_BPS);
        let chunks_total = TOTAL_BPS / resolution;
        let amount_at =
            |chunks: u64| ((trade_size as u128 * chunks as u128) / chunks_total as u128) as u64;

        let mut chunks = vec![0u64; members.len()];
        for _ in 0..chunks_total {
            let mut best: Option<(usize, f64)> = None;
            for (slot, &idx) in members.iter().enumerate() {
                let curve = viable[idx];
                let next = amount_at(chunks[slot] + 1);
                if !curve.can_take(next) {
                    continue;
                }
                let gain = curve.output_for(next) - curve.output_for(amount_at(chunks[slot]));
                if best.map_or(true, |(_, g)| gain > g) {
                    best = Some((slot, gain));
                }
            }
            match best {
                Some((slot, _)) => chunks[slot] += 1,
                None => break,
            }
        }

        let mut inputs: Vec<u64> = chunks.iter().map(|&c| amount_at(c)).collect();

        // Chunk flooring and capacity edges leave a remainder; hand it to
        // whichever members still have room, best marginal rate first
        let mut remaining = trade_size.saturating_sub(inputs.iter().sum());
        if remaining > 0 {
            let mut order: Vec<usize> = (0..members.len()).collect();
            order.sort_by(|&a, &b| {
                let ca = viable[members[a]];
                let cb = viable[members[b]];
                let ma = ca.output_for(inputs[a] + 1) - ca.output_for(inputs[a]);
                let mb = cb.output_for(inputs[b] + 1) - cb.output_for(inputs[b]);
                mb.total_cmp(&ma)
            });
            for slot in order {
                let curve = viable[members[slot]];
                let room = curve.max_fill(u64::MAX).saturating_sub(inputs[slot]);
                let add = room.min(remaining);
                inputs[slot] += add;
                remaining -= add;
                if remaining == 0 {
                    break;
                }
            }
        }

        let filled: u64 = inputs.iter().sum();
        if filled == 0 || inputs.iter().any(|&i| i == 0) {
            return None;
        }
        if members.len() > 1 {
            let below_min = inputs
                .iter()
                .any(|&i| (i as u128 * TOTAL_BPS as u128) / (filled as u128) < min_weight_bps as u128);
            if below_min {
                return None;
            }
        }

        let output = members
            .iter()
            .zip(&inputs)
            .map(|(&idx, &input)| viable[idx].output_for(input))
            .sum();

        Some(Candidate { members, inputs, filled, output })
    }

    /// Most filled, then best output, then fewest venues within the tie epsilon
    fn pick(&self, candidates: Vec<Candidate>) -> Option<Candidate> {
        let max_filled = candidates.iter().map(|c| c.filled).max()?;
        let full: Vec<Candidate> = candidates.into_iter().filter(|c| c.filled == max_filled).collect();
        let best_output = full.iter().map(|c| c.output).fold(f64::MIN, f64::max);
        let threshold =
            best_output * (1.0 - self.config.tie_epsilon_bps as f64 / TOTAL_BPS as f64);

        full.into_iter()
            .filter(|c| c.output >= threshold)
            .min_by(|a, b| {
                a.members
                    .len()
                    .cmp(&b.members.len())
                    .then_with(|| b.output.total_cmp(&a.output))
            })
    }

    fn build_outcome(
        &self,
        viable: &[&VenueCurve],
        chosen: Candidate,
        trade_size: u64,
        best_single_output: u64,
    ) -> SplitOutcome {
        let filled = chosen.filled.max(1);
        let mut splits: Vec<RouteSplit> = chosen
            .members
            .iter()
            .zip(&chosen.inputs)
            .map(|(&idx, &input)| {
                let curve = viable[idx];
                RouteSplit {
                    venue: curve.venue,
                    weight_bps: ((input as u128 * TOTAL_BPS as u128) / filled as u128) as u16,
                    input_amount: input,
                    expected_output: curve.output_for(input).floor() as u64,
                }
            })
            .collect();

        splits.sort_by(|a, b| b.input_amount.cmp(&a.input_amount));

        // Floor division loses a few bps; the largest leg absorbs them
        let assigned: u64 = splits.iter().map(|s| s.weight_bps as u64).sum();
        if let Some(first) = splits.first_mut() {
            first.weight_bps += (TOTAL_BPS - assigned) as u16;
        }

        let total_output: u64 = splits.iter().map(|s| s.expected_output).sum();
        let improvement_vs_single_bps = if best_single_output > 0 {
            ((total_output as i128 - best_single_output as i128) * TOTAL_BPS as i128
                / best_single_output as i128) as i64
        } else {
            0
        };

        if splits.len() > 1 {
            tracing::debug!(
                "Split {} across {} venues, +{} bps vs single venue",
                trade_size,
                splits.len(),
                improvement_vs_single_bps
            );
        }

        SplitOutcome {
            splits,
            requested_amount: trade_size,
            filled_amount: chosen.filled,
            total_output,
            best_single_output,
            improvement_vs_single_bps,
        }
    }
}
