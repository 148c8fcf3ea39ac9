//! Shared application state.

use checkout::CheckoutOrchestrator;
use domain::{CartService, OrderLifecycle, PricingPolicy};
use store::Store;

/// Services shared by every handler.
pub struct AppState<S: Store> {
    pub carts: CartService<S>,
    pub checkout: CheckoutOrchestrator<S>,
    pub orders: OrderLifecycle<S>,
    pub store: S,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, pricing: PricingPolicy) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            checkout: CheckoutOrchestrator::new(store.clone(), pricing),
            orders: OrderLifecycle::new(store.clone()),
            store,
        }
    }
}
