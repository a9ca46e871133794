//! Static plan catalog.
//!
//! The CRM sells a single paid premium plan; the zero-price trial plan
//! exists so free trials flow through the same subscription record and
//! history pipeline as paid billing.

use once_cell::sync::Lazy;

use crate::domain::foundation::PlanId;

use super::BillingCycle;

/// A billing plan: price in the smallest currency unit plus cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub price: i64,
    pub cycle: BillingCycle,
}

/// Plan id of the paid premium plan.
pub const PREMIUM_PLAN: &str = "premium";

/// Plan id of the zero-price free-trial plan.
pub const TRIAL_PLAN: &str = "premium_trial";

static CATALOG: Lazy<Vec<Plan>> = Lazy::new(|| {
    vec![
        Plan {
            id: PlanId::new(PREMIUM_PLAN).expect("static plan id"),
            name: "Homeport Premium".to_string(),
            price: 80_000,
            cycle: BillingCycle::Monthly,
        },
        Plan {
            id: PlanId::new(TRIAL_PLAN).expect("static plan id"),
            name: "Homeport Premium Trial".to_string(),
            price: 0,
            cycle: BillingCycle::Monthly,
        },
    ]
});

/// Looks up a plan by id.
pub fn find_plan(id: &PlanId) -> Option<&'static Plan> {
    CATALOG.iter().find(|p| &p.id == id)
}

/// Returns the trial plan.
pub fn trial_plan() -> &'static Plan {
    find_plan(&PlanId::new(TRIAL_PLAN).expect("static plan id")).expect("trial plan in catalog")
}
