use crate::habitica::{ApiResult, HabiticaApi};
use crate::models::{CATEGORIZATION_TAG_NAME, TagId};

/// Result of the read phase of tag resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagLookup {
    Found(TagId),
    Missing,
}

/// Scans the remote tags for the categorization tag. The first exact,
/// case-sensitive name match in server order wins.
pub fn find_categorization_tag(api: &HabiticaApi) -> ApiResult<TagLookup> {
    let tags = api.list_tags()?;
    Ok(
        match tags
            .into_iter()
            .find(|tag| tag.name == CATEGORIZATION_TAG_NAME)
        {
            Some(tag) => TagLookup::Found(tag.id),
            None => TagLookup::Missing,
        },
    )
}

/// Returns the categorization tag id, creating the tag with a single call when
/// it does not exist yet.
///
/// Two concurrent callers that both observe [`TagLookup::Missing`] each create
/// a tag; the API offers no conditional create. Callers in this crate are
/// serialised per workflow kind by [`crate::workflows::WorkflowRuntime`].
pub fn ensure_categorization_tag(api: &HabiticaApi) -> ApiResult<TagId> {
    match find_categorization_tag(api)? {
        TagLookup::Found(tag_id) => {
            tracing::debug!(tag_id = %tag_id, "reusing existing categorization tag");
            Ok(tag_id)
        }
        TagLookup::Missing => {
            let created = api.create_tag(CATEGORIZATION_TAG_NAME)?;
            tracing::info!(tag_id = %created.id, "created categorization tag");
            Ok(created.id)
        }
    }
}

/// Memoises the categorization tag for one workflow invocation. Failed
/// lookups are not cached.
pub struct CategorizationTag<'a> {
    api: &'a HabiticaApi,
    resolved: Option<TagId>,
}

impl<'a> CategorizationTag<'a> {
    pub fn new(api: &'a HabiticaApi) -> Self {
        Self {
            api,
            resolved: None,
        }
    }

    pub fn id(&mut self) -> ApiResult<TagId> {
        if let Some(tag_id) = &self.resolved {
            return Ok(tag_id.clone());
        }
        let tag_id = ensure_categorization_tag(self.api)?;
        self.resolved = Some(tag_id.clone());
        Ok(tag_id)
    }
}
