//! Collapses a fragment stream into the final response text.

use futures::{Stream, StreamExt};

use crate::Result;

/// Concatenate fragments in delivery order with no separator.
///
/// The first error aborts aggregation and whatever was collected so far is
/// discarded; a partial generation is never returned as complete.
pub async fn aggregate<S>(fragments: S) -> Result<String>
where
    S: Stream<Item = Result<String>>,
{
    let mut fragments = std::pin::pin!(fragments);
    let mut text = String::new();
    while let Some(fragment) = fragments.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use futures::stream;

    fn ok(parts: &[&str]) -> Vec<Result<String>> {
        parts.iter().map(|p| Ok(p.to_string())).collect()
    }

    #[tokio::test]
    async fn concatenates_in_order() {
        let text = aggregate(stream::iter(ok(&["Hel", "lo, ", "world"])))
            .await
            .unwrap();
        assert_eq!(text, "Hello, world");
    }

    #[tokio::test]
    async fn empty_stream_is_empty_string() {
        let text = aggregate(stream::iter(Vec::<Result<String>>::new()))
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn keeps_duplicates_and_whitespace() {
        let text = aggregate(stream::iter(ok(&["a", "a", " ", "", "\n", "a"])))
            .await
            .unwrap();
        assert_eq!(text, "aa \na");
    }

    #[tokio::test]
    async fn error_discards_partial_text() {
        let mut items = ok(&["partial"]);
        items.push(Err(Error::Backend("boom".into())));
        items.extend(ok(&["never seen"]));

        let err = aggregate(stream::iter(items)).await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }
}
