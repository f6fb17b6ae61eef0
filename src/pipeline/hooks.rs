//! Extension points around each lifecycle operation
//!
//! Every method defaults to an immediate success, so an implementation
//! overrides only the points it cares about. Returning an error aborts the
//! operation; nothing after the failing hook runs.

use super::error::PieceError;
use crate::Piece;
use crate::api::RequestContext;
use crate::list::{ListRequest, ListResults};
use async_trait::async_trait;

type HookResult = Result<(), PieceError>;

#[async_trait]
#[allow(unused_variables)]
pub trait PieceHooks: Send + Sync {
    /// After input was converted onto the working copy
    async fn after_convert(&self, ctx: &RequestContext, piece: &mut Piece) -> HookResult {
        Ok(())
    }

    async fn before_create(&self, ctx: &RequestContext, piece: &mut Piece) -> HookResult {
        Ok(())
    }

    /// Immediately before any write, for both create and update
    async fn before_save(&self, ctx: &RequestContext, piece: &mut Piece) -> HookResult {
        Ok(())
    }

    async fn after_create(&self, ctx: &RequestContext, piece: &Piece) -> HookResult {
        Ok(())
    }

    /// After any write, for both create and update
    async fn after_save(&self, ctx: &RequestContext, piece: &Piece) -> HookResult {
        Ok(())
    }

    async fn before_update(&self, ctx: &RequestContext, piece: &mut Piece) -> HookResult {
        Ok(())
    }

    async fn after_update(&self, ctx: &RequestContext, piece: &Piece) -> HookResult {
        Ok(())
    }

    async fn before_trash(&self, ctx: &RequestContext, id: &str) -> HookResult {
        Ok(())
    }

    async fn after_trash(&self, ctx: &RequestContext, id: &str) -> HookResult {
        Ok(())
    }

    async fn before_rescue(&self, ctx: &RequestContext, id: &str) -> HookResult {
        Ok(())
    }

    async fn after_rescue(&self, ctx: &RequestContext, id: &str) -> HookResult {
        Ok(())
    }

    /// May rewrite the request before the query is built
    async fn before_list(&self, ctx: &RequestContext, request: &mut ListRequest) -> HookResult {
        Ok(())
    }

    async fn after_list(&self, ctx: &RequestContext, results: &mut ListResults) -> HookResult {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl PieceHooks for NoHooks {}
