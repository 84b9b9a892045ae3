//! Capability Matching Service
//! Selects the implementation variant of a package that the host can run and
//! resolves soft package dependencies. Pure functions; no I/O.

use crate::domain::entities::{HostCapabilities, Implementation, SoftwarePackage};
use crate::domain::{DomainError, Result};
use tracing::trace;

/// The outcome of resolving one soft package dependency, including its own
/// transitive resolutions. Built whole-or-not-at-all: a failed resolution
/// leaves no partial selections behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedDependency {
    pub package_id: String,
    pub implementation_id: String,
    pub dependencies: Vec<MatchedDependency>,
}

/// Pick the first implementation (declaration order) whose processor and OS
/// constraints are satisfied by the host. Declaration order breaks ties.
pub fn match_implementation<'a>(
    package: &'a SoftwarePackage,
    host: &HostCapabilities,
) -> Result<&'a Implementation> {
    for implementation in &package.implementations {
        trace!(
            package = %package.name,
            implementation = %implementation.id,
            "checking implementation against host"
        );
        if satisfies_host(implementation, host) {
            return Ok(implementation);
        }
    }
    Err(DomainError::NoCompatibleImplementation(package.id.clone()))
}

/// Depth-first resolution of an implementation's soft package dependencies
/// against the same host. Each dependency package must yield an
/// implementation whose own dependencies also resolve; failure at any depth
/// fails the whole resolution.
pub fn resolve_softpkg_dependencies(
    implementation: &Implementation,
    host: &HostCapabilities,
) -> Result<Vec<MatchedDependency>> {
    let mut resolved = Vec::with_capacity(implementation.dependencies.len());
    for dependency in &implementation.dependencies {
        match resolve_dependency_implementation(dependency, host) {
            Some(matched) => {
                trace!(dependency = %dependency.name, implementation = %matched.implementation_id, "resolved soft package dependency");
                resolved.push(matched);
            }
            None => {
                return Err(DomainError::NoCompatibleImplementation(
                    dependency.id.clone(),
                ))
            }
        }
    }
    Ok(resolved)
}

/// Find an implementation of a dependency package that the host can run and
/// whose own dependencies recursively resolve.
fn resolve_dependency_implementation(
    package: &SoftwarePackage,
    host: &HostCapabilities,
) -> Option<MatchedDependency> {
    for implementation in &package.implementations {
        if !satisfies_host(implementation, host) {
            continue;
        }
        if let Ok(dependencies) = resolve_softpkg_dependencies(implementation, host) {
            return Some(MatchedDependency {
                package_id: package.id.clone(),
                implementation_id: implementation.id.clone(),
                dependencies,
            });
        }
    }
    None
}

fn satisfies_host(implementation: &Implementation, host: &HostCapabilities) -> bool {
    let processor_ok = implementation.processors.is_empty()
        || implementation
            .processors
            .iter()
            .any(|p| p == &host.processor);

    let os_ok = implementation.os_requirements.is_empty()
        || implementation.os_requirements.iter().any(|req| {
            req.name == host.os_name
                && req
                    .version
                    .as_ref()
                    .map(|v| v == &host.os_version)
                    .unwrap_or(true)
        });

    processor_ok && os_ok
}
