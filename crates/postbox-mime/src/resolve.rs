//! Preferred-type body resolution.

use std::future::Future;

use crate::error::Error;
use crate::structure::{BodyPart, Leaf, MediaType, PartNumber};

/// Fetches the raw (still transfer-encoded) bytes of one body part.
pub trait PartSource {
    /// Fetch error. Must absorb decoding errors too.
    type Error: From<Error>;

    /// Returns the bytes of `part`.
    fn fetch_part(&self, part: &PartNumber) -> impl Future<Output = Result<Vec<u8>, Self::Error>>;
}

/// A body part that matched the requested media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPart {
    /// Where the part sits in the tree.
    pub part: PartNumber,
    /// Its media type.
    pub media_type: MediaType,
    /// Decoded text.
    pub text: String,
}

/// Finds the first leaf of type `target` whose decoded content is not
/// empty.
///
/// Leaves are tried depth first in part order; multipart nodes never match
/// themselves. `Ok(None)` means no candidate had content.
///
/// A candidate whose content does not decode under its transfer encoding
/// counts as empty.
///
/// # Errors
///
/// Fetch errors from `source`.
pub async fn resolve<S: PartSource>(
    tree: &BodyPart,
    target: &MediaType,
    source: &S,
) -> Result<Option<ResolvedPart>, S::Error> {
    for (part, leaf) in tree.candidates(target) {
        let raw = source.fetch_part(&part).await?;
        let text = match leaf.decode_text(&raw) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(part = %part, error = %err, "candidate part does not decode");
                continue;
            }
        };
        if text.is_empty() {
            tracing::debug!(part = %part, media_type = %target, "candidate part is empty");
            continue;
        }
        return Ok(Some(ResolvedPart {
            part,
            media_type: leaf.mime_type(),
            text,
        }));
    }
    Ok(None)
}

/// Fetches one leaf and decodes it to text.
///
/// # Errors
///
/// Fetch errors from `source`, and content that does not decode under its
/// transfer encoding.
pub async fn fetch_text<S: PartSource>(
    source: &S,
    part: &PartNumber,
    leaf: &Leaf,
) -> Result<String, S::Error> {
    let raw = source.fetch_part(part).await?;
    Ok(leaf.decode_text(&raw)?)
}

/// Fetches one leaf and removes its transfer encoding.
///
/// # Errors
///
/// As for [`fetch_text`].
pub async fn fetch_bytes<S: PartSource>(
    source: &S,
    part: &PartNumber,
    leaf: &Leaf,
) -> Result<Vec<u8>, S::Error> {
    let raw = source.fetch_part(part).await?;
    Ok(leaf.decode(&raw)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::encoding::TransferEncoding;

    #[derive(Default)]
    struct Parts {
        bodies: HashMap<String, Vec<u8>>,
        fetched: RefCell<Vec<String>>,
    }

    impl Parts {
        fn with(mut self, part: &str, body: &[u8]) -> Self {
            self.bodies.insert(part.into(), body.to_vec());
            self
        }
    }

    impl PartSource for Parts {
        type Error = Error;

        async fn fetch_part(&self, part: &PartNumber) -> Result<Vec<u8>, Error> {
            self.fetched.borrow_mut().push(part.to_string());
            Ok(self.bodies.get(&part.to_string()).cloned().unwrap_or_default())
        }
    }

    fn text(subtype: &str) -> BodyPart {
        BodyPart::Leaf(Leaf {
            media_type: "text".into(),
            subtype: Some(subtype.into()),
            ..Leaf::default()
        })
    }

    fn alternative() -> BodyPart {
        BodyPart::Multipart {
            subtype: "alternative".into(),
            children: vec![text("plain"), text("html")],
        }
    }

    #[tokio::test]
    async fn test_html_child_of_alternative() {
        let source = Parts::default()
            .with("1", b"plain body")
            .with("2", b"<p>html body</p>");
        let found = resolve(&alternative(), &MediaType::text_html(), &source)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.part.to_string(), "2");
        assert_eq!(found.text, "<p>html body</p>");
        assert_eq!(*source.fetched.borrow(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_single_plain_leaf_has_no_html() {
        let source = Parts::default().with("1", b"just text");
        let tree = text("plain");
        assert!(resolve(&tree, &MediaType::text_html(), &source)
            .await
            .unwrap()
            .is_none());
        let found = resolve(&tree, &MediaType::text_plain(), &source)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.text, "just text");
    }

    #[tokio::test]
    async fn test_empty_candidate_is_skipped() {
        let tree = BodyPart::Multipart {
            subtype: "mixed".into(),
            children: vec![text("html"), alternative()],
        };
        let source = Parts::default().with("2.2", b"<b>second</b>");
        let found = resolve(&tree, &MediaType::text_html(), &source)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.part.to_string(), "2.2");
        assert_eq!(*source.fetched.borrow(), vec!["1", "2.2"]);
    }

    #[tokio::test]
    async fn test_base64_part_is_decoded() {
        let tree = BodyPart::Leaf(Leaf {
            media_type: "text".into(),
            subtype: Some("html".into()),
            encoding: TransferEncoding::Base64,
            ..Leaf::default()
        });
        let source = Parts::default().with("1", b"PGk+aGk8L2k+\r\n");
        let found = resolve(&tree, &MediaType::text_html(), &source)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.text, "<i>hi</i>");
    }

    #[tokio::test]
    async fn test_undecodable_candidate_is_skipped() {
        let html = |_: usize| {
            BodyPart::Leaf(Leaf {
                media_type: "text".into(),
                subtype: Some("html".into()),
                encoding: TransferEncoding::Base64,
                ..Leaf::default()
            })
        };
        let tree = BodyPart::Multipart {
            subtype: "mixed".into(),
            children: (0..2).map(html).collect(),
        };
        let source = Parts::default()
            .with("1", b"not*base64!")
            .with("2", b"PGI+b2s8L2I+");
        let found = resolve(&tree, &MediaType::text_html(), &source)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.part.to_string(), "2");
        assert_eq!(found.text, "<b>ok</b>");

        let BodyPart::Multipart { children, .. } = &tree else { unreachable!() };
        let BodyPart::Leaf(first) = &children[0] else { unreachable!() };
        let broken = fetch_text(&source, &"1".parse().unwrap(), first).await;
        assert!(matches!(broken, Err(Error::Base64Decode(_))));
    }
}
