use futures::{Stream, stream};

use crate::{
    error::Result,
    provider::{PageRequest, TransactionProvider},
    types::RawTransaction,
};

/// Returns stream of consecutive pages of raw transactions, starting with
/// `first` and advancing the page index by one per item.
///
/// The stream ends after the first page shorter than the requested limit,
/// or right after yielding an error.
pub fn pages<P>(
    provider: &P,
    first: PageRequest,
) -> impl Stream<Item = Result<Vec<RawTransaction>>> + Send + '_
where
    P: TransactionProvider,
{
    stream::unfold(Some(first), move |request| async move {
        let request = request?;
        let result = provider.fetch_page(&request).await;
        let next = match &result {
            Ok(page) if page.len() >= request.limit() as usize => Some(request.next_page()),
            _ => None,
        };
        Some((result, next))
    })
}

#[cfg(test)]
mod tests {
    use futures::{StreamExt, TryStreamExt};

    use super::*;
    use crate::{
        error::Error,
        testing::{ScriptedProvider, raw_tx},
        types::Pool,
    };

    #[tokio::test]
    async fn test_short_page_ends_stream() {
        let provider = ScriptedProvider::new((0..7).map(|n| raw_tx(n, n * 10)).collect());
        let pages: Vec<_> = pages(&provider, PageRequest::new(Pool::EthUsdc, 3))
            .try_collect()
            .await
            .unwrap();

        let sizes: Vec<_> = pages.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_full_last_page_needs_empty_page() {
        let provider = ScriptedProvider::new((0..6).map(|n| raw_tx(n, n * 10)).collect());
        let pages: Vec<_> = pages(&provider, PageRequest::new(Pool::EthUsdc, 3))
            .try_collect()
            .await
            .unwrap();

        let sizes: Vec<_> = pages.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 0]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let provider = ScriptedProvider::new((0..10).map(|n| raw_tx(n, n)).collect())
            .failing_on_page(1, || Error::Http(500));
        let results: Vec<_> = pages(&provider, PageRequest::new(Pool::EthUsdc, 2))
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Http(500))));
    }
}
