//! Bounded parallel `map` over the global [`EagerPool`].
//!
//! Small inputs (at most one item) and `max_degree <= 1` run sequentially on the
//! caller's thread. Results always come back in input order.

use crate::eager_pool::EagerPool;

pub fn map<T, F, R>(max_degree: usize, items: impl IntoIterator<Item = T>, f: F) -> Vec<R>
where
    F: Fn(T) -> R + Send + Sync,
    T: Send,
    R: Send,
{
    let items = items.into_iter().collect::<Vec<_>>();
    if items.len() <= 1 || max_degree <= 1 {
        return items.into_iter().map(f).collect();
    }
    let f = &f;
    EagerPool::global().restricted_scope(max_degree, |scope| {
        let deferred = items
            .into_iter()
            .map(|item| scope.spawn(move || f(item)))
            .collect::<Vec<_>>();
        deferred.into_iter().map(|h| h.join()).collect()
    })
}
