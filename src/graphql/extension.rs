//! Middleware contract exposed by the executor
//!
//! Interceptors form chains: each one receives a `next` handle and decides
//! whether, and how, to call the rest of the chain.

use crate::graphql::context::RequestContext;
use crate::graphql::resolver::{FieldBindings, ResolveParams, Resolver};
use crate::graphql::response::Response;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Kind of the executed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        })
    }
}

/// The operation about to run
#[derive(Debug, Clone)]
pub struct OperationInfo {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub query: String,
    /// Response keys of the root selection, in order
    pub root_fields: Vec<String>,
}

/// Wraps the execution of a whole operation
#[async_trait]
pub trait OperationInterceptor: Send + Sync {
    async fn intercept_operation(
        &self,
        ctx: &RequestContext,
        operation: &OperationInfo,
        next: OperationNext<'_>,
    ) -> Response;
}

/// Post-processes every response, including request-level failures
pub trait ResponseInterceptor: Send + Sync {
    fn intercept_response(&self, ctx: &RequestContext, response: Response) -> Response;
}

/// Contributes an entry to `response.extensions`
pub trait ExtensionData: Send + Sync {
    fn name(&self) -> &str;
    fn data(&self, ctx: &RequestContext) -> Option<Value>;
}

/// Wraps the resolution of every field that has no introspection meaning
#[async_trait]
pub trait FieldMiddleware: Send + Sync {
    async fn call(&self, params: ResolveParams, next: FieldNext<'_>) -> Result<Value>;
}

/// The rest of an operation interceptor chain
pub struct OperationNext<'a> {
    chain: &'a [Arc<dyn OperationInterceptor>],
    endpoint: &'a (dyn Fn() -> BoxFuture<'a, Response> + Send + Sync),
}

impl<'a> OperationNext<'a> {
    pub(crate) fn new(
        chain: &'a [Arc<dyn OperationInterceptor>],
        endpoint: &'a (dyn Fn() -> BoxFuture<'a, Response> + Send + Sync),
    ) -> Self {
        Self { chain, endpoint }
    }

    pub async fn run(self, ctx: &RequestContext, operation: &OperationInfo) -> Response {
        match self.chain.split_first() {
            Some((first, rest)) => {
                let next = OperationNext::new(rest, self.endpoint);
                first.intercept_operation(ctx, operation, next).await
            }
            None => (self.endpoint)().await,
        }
    }
}

/// Where a field's value ultimately comes from
#[derive(Clone, Copy)]
pub(crate) enum FieldEndpoint<'a> {
    Resolver(&'a dyn Resolver),
    Default(&'a FieldBindings),
}

/// The rest of a field middleware chain
pub struct FieldNext<'a> {
    chain: &'a [Arc<dyn FieldMiddleware>],
    endpoint: FieldEndpoint<'a>,
}

impl<'a> FieldNext<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn FieldMiddleware>], endpoint: FieldEndpoint<'a>) -> Self {
        Self { chain, endpoint }
    }

    pub async fn run(self, params: ResolveParams) -> Result<Value> {
        match self.chain.split_first() {
            Some((first, rest)) => first.call(params, FieldNext::new(rest, self.endpoint)).await,
            None => match self.endpoint {
                FieldEndpoint::Resolver(resolver) => resolver.resolve(params).await,
                FieldEndpoint::Default(bindings) => bindings.resolve(
                    &params.info.parent_type,
                    &params.info.field.name,
                    &params.parent,
                ),
            },
        }
    }
}
