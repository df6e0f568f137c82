//! Resource tree walker — flattens the account → campaign → ad set → ad
//! hierarchy into a selectable list of insight targets.

use adwatch_core::error::{AdWatchError, AdWatchResult};
use adwatch_core::types::{ResourceKind, ResourceRef, TargetOption};
use adwatch_integrations::client::RESOURCE_FIELDS;
use adwatch_integrations::{AdResource, AdsClient, ClientSession};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ResourceTreeWalker {
    client: Arc<dyn AdsClient>,
    session: ClientSession,
    ad_user: String,
    legacy_ad_leaf: bool,
}

impl ResourceTreeWalker {
    pub fn new(client: Arc<dyn AdsClient>, session: ClientSession) -> Self {
        Self {
            client,
            session,
            ad_user: "me".to_string(),
            legacy_ad_leaf: false,
        }
    }

    /// Ad user whose accounts are the roots of the walk.
    pub fn with_ad_user(mut self, ad_user: impl Into<String>) -> Self {
        self.ad_user = ad_user.into();
        self
    }

    /// Emit ad leaves with the parent ad set's id and name instead of the
    /// ad's own.
    pub fn with_legacy_ad_leaf(mut self, enabled: bool) -> Self {
        self.legacy_ad_leaf = enabled;
        self
    }

    /// Immediate children of `parent_id` at level `kind`, with unnamed
    /// entries labelled `"{Kind} #{position}"`.
    pub fn children(&self, kind: ResourceKind, parent_id: &str) -> AdWatchResult<Vec<TargetOption>> {
        let found = self
            .client
            .children(&self.session, kind, parent_id, &RESOURCE_FIELDS)
            .map_err(|cause| AdWatchError::ResourceFetch {
                kind,
                id: parent_id.to_string(),
                cause,
            })?;
        debug!(kind = %kind, parent = parent_id, count = found.len(), "Fetched children");
        Ok(found
            .into_iter()
            .enumerate()
            .map(|(n, res)| decorate(kind, n, res))
            .collect())
    }

    pub fn accounts(&self) -> AdWatchResult<Vec<TargetOption>> {
        self.children(ResourceKind::Account, &self.ad_user)
    }

    pub fn campaigns(&self, account_id: &str) -> AdWatchResult<Vec<TargetOption>> {
        self.children(ResourceKind::Campaign, account_id)
    }

    pub fn ad_sets(&self, campaign_id: &str) -> AdWatchResult<Vec<TargetOption>> {
        self.children(ResourceKind::AdSet, campaign_id)
    }

    pub fn ads(&self, adset_id: &str) -> AdWatchResult<Vec<TargetOption>> {
        self.children(ResourceKind::Ad, adset_id)
    }

    /// Depth-first listing of every account, campaign, ad set and ad as
    /// `{value: "<kind>/<id>", name}` with one `-` of indent per level. Any
    /// failed listing aborts the whole walk.
    pub fn list_all_insight_targets(&self) -> AdWatchResult<Vec<TargetOption>> {
        let mut out = Vec::new();
        self.walk(ResourceKind::Account, &self.ad_user, None, &mut out)?;
        info!(targets = out.len(), ad_user = %self.ad_user, "Listed insight targets");
        Ok(out)
    }

    fn walk(
        &self,
        kind: ResourceKind,
        parent_id: &str,
        parent: Option<&TargetOption>,
        out: &mut Vec<TargetOption>,
    ) -> AdWatchResult<()> {
        let indent = "-".repeat(kind.depth());
        for child in self.children(kind, parent_id)? {
            let source = match parent {
                Some(adset) if kind == ResourceKind::Ad && self.legacy_ad_leaf => adset,
                _ => &child,
            };
            out.push(TargetOption {
                value: ResourceRef::new(kind, source.value.as_str()).token(),
                name: format!("{indent}{}", source.name),
            });
            if let Some(next) = kind.child() {
                self.walk(next, &child.value, Some(&child), out)?;
            }
        }
        Ok(())
    }
}

fn decorate(kind: ResourceKind, position: usize, res: AdResource) -> TargetOption {
    let name = res
        .name
        .unwrap_or_else(|| format!("{} #{}", kind.label(), position));
    TargetOption {
        value: res.id,
        name,
    }
}
