use std::future::Future;
use std::pin::Pin;

/// Owned, sendable future returned by the object-safe async traits
/// ([`CommandRunner`](crate::exec::CommandRunner),
/// [`PackageInstaller`](crate::pkg::PackageInstaller)) and by stage handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stage name as used in config files and logs.
pub type StageName = String;
