use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dto::pricing::{AppliedTier, PricingInfo, TierRecommendation},
    entity::{
        pricing_tiers::{Column as TierCol, Entity as PricingTiers},
        products::Entity as Products,
        team_discounts::Entity as TeamDiscounts,
    },
    error::{AppError, AppResult},
    models::PricingTier,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// How many upsell recommendations a quote carries at most.
const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum TierTableError {
    #[error("tier table is empty")]
    Empty,
    #[error("first tier must start at quantity 1, got {0}")]
    FirstTier(i32),
    #[error("tier starting at {min} ends at {max}, below its own minimum")]
    InvertedRange { min: i32, max: i32 },
    #[error("discount percent {0} is out of range 0..=100")]
    DiscountOutOfRange(f64),
    #[error("tier starting at {next} does not continue the tier starting at {prev}")]
    NotContiguous { prev: i32, next: i32 },
    #[error("last tier must be open-ended")]
    ClosedTail,
}

/// Check a candidate tier table before it is persisted: first range starts
/// at 1, ranges are contiguous and non-overlapping, the final range is
/// open-ended. A table that passes matches exactly one tier for every
/// quantity >= 1.
pub fn validate_tier_table(tiers: &[PricingTier]) -> Result<(), TierTableError> {
    if tiers.is_empty() {
        return Err(TierTableError::Empty);
    }

    let first = &tiers[0];
    if first.min_quantity != 1 {
        return Err(TierTableError::FirstTier(first.min_quantity));
    }

    for (i, tier) in tiers.iter().enumerate() {
        if !(0.0..=100.0).contains(&tier.discount_percent) {
            return Err(TierTableError::DiscountOutOfRange(tier.discount_percent));
        }
        match tier.max_quantity {
            Some(max) if max < tier.min_quantity => {
                return Err(TierTableError::InvertedRange {
                    min: tier.min_quantity,
                    max,
                });
            }
            Some(max) => {
                if i == tiers.len() - 1 {
                    return Err(TierTableError::ClosedTail);
                }
                let next = &tiers[i + 1];
                if next.min_quantity != max + 1 {
                    return Err(TierTableError::NotContiguous {
                        prev: tier.min_quantity,
                        next: next.min_quantity,
                    });
                }
            }
            None => {
                if i != tiers.len() - 1 {
                    return Err(TierTableError::NotContiguous {
                        prev: tier.min_quantity,
                        next: tiers[i + 1].min_quantity,
                    });
                }
            }
        }
    }

    Ok(())
}

/// The unique active tier covering `quantity`, if the table has one.
pub fn select_tier(tiers: &[PricingTier], quantity: i32) -> Option<&PricingTier> {
    tiers.iter().find(|t| {
        t.is_active
            && t.min_quantity <= quantity
            && t.max_quantity.is_none_or(|max| quantity <= max)
    })
}

/// Tier and team percentages compose multiplicatively so two discounts can
/// never exceed 100% off. Result is rounded to a whole cent.
pub fn discounted_unit_price(base_price: i64, tier_percent: f64, team_percent: f64) -> i64 {
    let factor = (1.0 - tier_percent / 100.0) * (1.0 - team_percent / 100.0);
    ((base_price as f64) * factor).round() as i64
}

/// Price `quantity` units of a product against its tier table. Pure; never
/// fails. A quantity no tier covers degrades to the base price with zero
/// discount and a configuration warning in the log.
pub fn quote(
    product_id: Uuid,
    base_price: i64,
    quantity: i32,
    tiers: &[PricingTier],
    team_percent: Option<f64>,
) -> PricingInfo {
    let tier = select_tier(tiers, quantity);
    if tier.is_none() && !tiers.is_empty() {
        tracing::warn!(
            %product_id,
            quantity,
            "no pricing tier covers this quantity, falling back to base price"
        );
    }

    let tier_percent = tier.map(|t| t.discount_percent).unwrap_or(0.0);
    let team_percent_applied = team_percent.unwrap_or(0.0);

    let unit_price = discounted_unit_price(base_price, tier_percent, team_percent_applied);
    let total_price = unit_price * quantity as i64;

    // Savings are reported from the unrounded rate so that e.g. 10 units at
    // 10% off $24.99 show exactly one unit's worth of savings.
    let factor = (1.0 - tier_percent / 100.0) * (1.0 - team_percent_applied / 100.0);
    let raw_total = ((base_price * quantity as i64) as f64 * factor).round() as i64;
    let total_savings = base_price * quantity as i64 - raw_total;

    let recommendations = recommend_tiers(base_price, quantity, total_price, tiers, team_percent);

    PricingInfo {
        product_id,
        quantity,
        base_unit_price: base_price,
        unit_price,
        tier: tier.map(|t| AppliedTier {
            min_quantity: t.min_quantity,
            max_quantity: t.max_quantity,
            discount_percent: t.discount_percent,
        }),
        team_discount_percent: team_percent,
        total_price,
        total_savings,
        recommendations,
    }
}

/// Higher tiers where buying the tier's minimum costs less in total than
/// the quantity actually requested. At most three, best first.
fn recommend_tiers(
    base_price: i64,
    quantity: i32,
    current_total: i64,
    tiers: &[PricingTier],
    team_percent: Option<f64>,
) -> Vec<TierRecommendation> {
    let team = team_percent.unwrap_or(0.0);
    let mut recs: Vec<TierRecommendation> = tiers
        .iter()
        .filter(|t| t.is_active && t.min_quantity > quantity)
        .filter_map(|t| {
            let unit_price = discounted_unit_price(base_price, t.discount_percent, team);
            let total_price = unit_price * t.min_quantity as i64;
            if total_price < current_total {
                Some(TierRecommendation {
                    min_quantity: t.min_quantity,
                    discount_percent: t.discount_percent,
                    unit_price,
                    total_price,
                    additional_savings: current_total - total_price,
                })
            } else {
                None
            }
        })
        .collect();

    recs.sort_by(|a, b| b.additional_savings.cmp(&a.additional_savings));
    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}

/// Active tiers for a product, ordered the way the engine expects them.
pub async fn load_tiers(state: &AppState, product_id: Uuid) -> AppResult<Vec<PricingTier>> {
    let tiers = PricingTiers::find()
        .filter(TierCol::ProductId.eq(product_id))
        .filter(TierCol::IsActive.eq(true))
        .order_by_asc(TierCol::MinQuantity)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|t| PricingTier {
            min_quantity: t.min_quantity,
            max_quantity: t.max_quantity,
            discount_percent: t.discount_percent,
            is_active: t.is_active,
        })
        .collect();
    Ok(tiers)
}

/// Active team discount percent, or None when the team is unknown or the
/// discount is switched off.
pub async fn load_team_percent(state: &AppState, team_id: Uuid) -> AppResult<Option<f64>> {
    let team = TeamDiscounts::find_by_id(team_id).one(&state.orm).await?;
    Ok(team.filter(|t| t.is_active).map(|t| t.discount_percent))
}

pub async fn compute_pricing(
    state: &AppState,
    product_id: Uuid,
    quantity: i32,
    team_id: Option<Uuid>,
) -> AppResult<ApiResponse<PricingInfo>> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let tiers = load_tiers(state, product_id).await?;
    let team_percent = match team_id {
        Some(id) => load_team_percent(state, id).await?,
        None => None,
    };

    let info = quote(product_id, product.base_price, quantity, &tiers, team_percent);
    Ok(ApiResponse::success("OK", info, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(min: i32, max: Option<i32>, percent: f64) -> PricingTier {
        PricingTier {
            min_quantity: min,
            max_quantity: max,
            discount_percent: percent,
            is_active: true,
        }
    }

    // $24.99 base, 0% below 10 units, 10% to 49, 20% from 50 up.
    fn apparel_tiers() -> Vec<PricingTier> {
        vec![
            tier(1, Some(9), 0.0),
            tier(10, Some(49), 10.0),
            tier(50, None, 20.0),
        ]
    }

    const BASE: i64 = 2499;

    #[test]
    fn exactly_one_tier_matches_every_quantity() {
        let tiers = apparel_tiers();
        assert!(validate_tier_table(&tiers).is_ok());
        for q in 1..=1000 {
            let matching = tiers
                .iter()
                .filter(|t| {
                    t.min_quantity <= q && t.max_quantity.is_none_or(|max| q <= max)
                })
                .count();
            assert_eq!(matching, 1, "quantity {q}");
        }
    }

    #[test]
    fn unit_price_is_non_increasing() {
        let tiers = apparel_tiers();
        let mut last = i64::MAX;
        for q in 1..=1000 {
            let info = quote(Uuid::new_v4(), BASE, q, &tiers, None);
            assert!(info.unit_price <= last, "quantity {q}");
            last = info.unit_price;
        }
    }

    #[test]
    fn savings_never_negative() {
        let tiers = apparel_tiers();
        for q in [1, 9, 10, 25, 49, 50, 500, 1000] {
            let info = quote(Uuid::new_v4(), BASE, q, &tiers, Some(15.0));
            assert!(info.total_savings >= 0, "quantity {q}");
        }
    }

    #[test]
    fn ten_units_hit_the_first_discount() {
        let info = quote(Uuid::new_v4(), BASE, 10, &apparel_tiers(), None);
        assert_eq!(info.unit_price, 2249);
        assert_eq!(info.total_price, 22490);
        assert_eq!(info.total_savings, 2499);
        let applied = info.tier.expect("tier");
        assert_eq!(applied.min_quantity, 10);
    }

    #[test]
    fn forty_nine_units_stay_in_the_middle_tier() {
        let info = quote(Uuid::new_v4(), BASE, 49, &apparel_tiers(), None);
        assert_eq!(info.unit_price, 2249);
        assert_eq!(info.total_price, 110201);
    }

    #[test]
    fn fifty_units_are_cheaper_in_total_than_forty_nine() {
        let info = quote(Uuid::new_v4(), BASE, 50, &apparel_tiers(), None);
        assert_eq!(info.unit_price, 1999);
        assert_eq!(info.total_price, 99950);

        let at_49 = quote(Uuid::new_v4(), BASE, 49, &apparel_tiers(), None);
        assert!(info.total_price < at_49.total_price);
    }

    #[test]
    fn forty_five_units_recommend_the_top_tier() {
        let info = quote(Uuid::new_v4(), BASE, 45, &apparel_tiers(), None);
        let rec = info
            .recommendations
            .first()
            .expect("expected an upsell recommendation");
        assert_eq!(rec.min_quantity, 50);
        assert_eq!(rec.total_price, 99950);
        assert_eq!(rec.additional_savings, 2249 * 45 - 99950);
    }

    #[test]
    fn small_quantities_get_no_recommendation() {
        // Jumping from 2 to 10 units costs more in absolute terms.
        let info = quote(Uuid::new_v4(), BASE, 2, &apparel_tiers(), None);
        assert!(info.recommendations.is_empty());
    }

    #[test]
    fn team_discount_composes_multiplicatively() {
        let tiers = vec![tier(1, Some(9), 0.0), tier(10, None, 10.0)];
        let info = quote(Uuid::new_v4(), 10000, 10, &tiers, Some(20.0));
        // 10000 * 0.9 * 0.8, not 10000 * (1 - 0.30)
        assert_eq!(info.unit_price, 7200);
    }

    #[test]
    fn gap_in_the_table_falls_back_to_base_price() {
        let tiers = vec![tier(5, Some(9), 10.0), tier(10, None, 20.0)];
        let info = quote(Uuid::new_v4(), BASE, 2, &tiers, None);
        assert!(info.tier.is_none());
        assert_eq!(info.unit_price, BASE);
        assert_eq!(info.total_savings, 0);
    }

    #[test]
    fn inactive_tiers_are_skipped() {
        let mut tiers = apparel_tiers();
        tiers[1].is_active = false;
        assert!(select_tier(&tiers, 20).is_none());
    }

    #[test]
    fn validation_rejects_broken_tables() {
        assert_eq!(validate_tier_table(&[]), Err(TierTableError::Empty));

        let starts_late = vec![tier(2, None, 0.0)];
        assert_eq!(
            validate_tier_table(&starts_late),
            Err(TierTableError::FirstTier(2))
        );

        let gap = vec![tier(1, Some(9), 0.0), tier(11, None, 10.0)];
        assert_eq!(
            validate_tier_table(&gap),
            Err(TierTableError::NotContiguous { prev: 1, next: 11 })
        );

        let overlap = vec![tier(1, Some(10), 0.0), tier(10, None, 10.0)];
        assert_eq!(
            validate_tier_table(&overlap),
            Err(TierTableError::NotContiguous { prev: 1, next: 10 })
        );

        let closed_tail = vec![tier(1, Some(9), 0.0), tier(10, Some(49), 10.0)];
        assert_eq!(
            validate_tier_table(&closed_tail),
            Err(TierTableError::ClosedTail)
        );

        let inverted = vec![tier(1, Some(9), 0.0), tier(10, Some(5), 10.0)];
        assert_eq!(
            validate_tier_table(&inverted),
            Err(TierTableError::InvertedRange { min: 10, max: 5 })
        );

        let bad_percent = vec![tier(1, None, 120.0)];
        assert_eq!(
            validate_tier_table(&bad_percent),
            Err(TierTableError::DiscountOutOfRange(120.0))
        );
    }
}
