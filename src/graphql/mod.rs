//! GraphQL schema model, field collection and execution

pub mod collector;
pub mod context;
pub mod dataloader;
pub mod executor;
pub mod extension;
pub mod introspection;
pub mod resolver;
pub mod response;
pub mod schema;
pub mod value;

pub use collector::{FieldCollector, SelectedField, SelectionSet, collect_fields};
pub use context::RequestContext;
pub use dataloader::{BatchLoad, DataLoader, DataLoaderConfig, LoadError};
pub use executor::{Executor, ExecutorBuilder};
pub use extension::{
    ExtensionData, FieldMiddleware, FieldNext, OperationInfo, OperationInterceptor, OperationKind,
    OperationNext, ResponseInterceptor,
};
pub use resolver::{FieldBindings, ResolveInfo, ResolveParams, Resolver, resolver_fn};
pub use response::{
    CancelHandle, CancelSignal, GraphQLError, Location, PathSegment, Request, Response,
    ResponsePath,
};
pub use schema::{
    FieldDefinition, ObjectType, RelationKind, ScalarMarshaler, Schema, TypeKind, TypeRef,
};
