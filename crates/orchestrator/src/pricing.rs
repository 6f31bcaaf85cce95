//! Concurrent price resolution against the catalog service.

use std::sync::Arc;

use common::ItemId;
use domain::{LineItem, Money};
use futures_util::StreamExt;
use serde::Deserialize;

use crate::services::CatalogService;

/// Default ceiling on outstanding concurrent catalog lookups.
const DEFAULT_FAN_OUT: usize = 8;

/// One requested line of a transaction, before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ItemRequest {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// The result of a pricing pass.
///
/// Failed lookups never abort the pass: they are excluded from the
/// subtotal and reported in `unresolved`, and it is the caller's policy
/// whether that blocks anything (by default it does not).
#[derive(Debug, Clone)]
pub struct PricingOutcome {
    /// Line items in the order they were requested.
    pub line_items: Vec<LineItem>,
    /// IDs of items that failed resolution.
    pub unresolved: Vec<ItemId>,
    /// Aggregate subtotal over resolved items only.
    pub subtotal: Money,
}

/// Resolves item prices with bounded concurrent fan-out.
pub struct PriceResolver<C> {
    catalog: Arc<C>,
    fan_out: usize,
}

impl<C: CatalogService> PriceResolver<C> {
    /// Creates a resolver over the given catalog seam.
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    /// Overrides the concurrent-lookup ceiling.
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    /// Prices every requested item, concurrently and independently.
    ///
    /// A lookup failure or unknown item yields an unresolved placeholder
    /// line; it never blocks resolution of the other items.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn resolve(&self, items: &[ItemRequest]) -> PricingOutcome {
        let mut indexed: Vec<(usize, LineItem)> = futures_util::stream::iter(
            items.iter().copied().enumerate().map(|(index, request)| {
                let catalog = Arc::clone(&self.catalog);
                async move {
                    let line = match catalog.item(request.item_id).await {
                        Ok(Some(item)) => LineItem::resolved(
                            request.item_id,
                            item.name,
                            request.quantity,
                            item.price,
                        ),
                        Ok(None) => {
                            tracing::warn!(item_id = %request.item_id, "item not in catalog");
                            LineItem::unresolved(request.item_id, request.quantity)
                        }
                        Err(err) => {
                            tracing::warn!(
                                item_id = %request.item_id,
                                error = %err,
                                "catalog lookup failed"
                            );
                            LineItem::unresolved(request.item_id, request.quantity)
                        }
                    };
                    (index, line)
                }
            }),
        )
        .buffer_unordered(self.fan_out)
        .collect()
        .await;

        // buffer_unordered yields in completion order; restore request order.
        indexed.sort_by_key(|(index, _)| *index);

        let line_items: Vec<LineItem> = indexed.into_iter().map(|(_, line)| line).collect();
        let unresolved: Vec<ItemId> = line_items
            .iter()
            .filter(|line| !line.is_resolved())
            .map(|line| line.item_id)
            .collect();
        let subtotal = line_items
            .iter()
            .filter(|line| line.is_resolved())
            .map(|line| line.subtotal)
            .sum();

        if !unresolved.is_empty() {
            metrics::counter!("pricing_unresolved_items_total")
                .increment(unresolved.len() as u64);
        }

        PricingOutcome {
            line_items,
            unresolved,
            subtotal,
        }
    }
}
