//! Deployment Planning Service
//! Partitions the node's placements into standalone launches and composite
//! parts deployed onto a parent device, matching each against the host
//! first. Placements that cannot be planned are dropped with an error
//! record; planning failures are never fatal to startup.

use crate::domain::entities::{HostCapabilities, Placement, ProgramProfile, SoftwarePackage};
use crate::domain::services::capability_matching::{
    match_implementation, resolve_softpkg_dependencies, MatchedDependency,
};
use crate::domain::services::descriptor_loading::merge_properties;
use crate::domain::{CodeKind, DomainError};
use tracing::{debug, error};

/// A placement that survived planning: its effective profile and selected
/// implementation.
#[derive(Debug, Clone)]
pub struct PlannedPlacement {
    pub placement: Placement,
    pub profile: ProgramProfile,
    pub implementation_id: String,
    pub code_kind: CodeKind,
    /// Code artifact path of the selected implementation
    pub code_path: String,
    pub resolved_dependencies: Vec<MatchedDependency>,
}

/// Record of a placement dropped during planning.
#[derive(Debug)]
pub struct DroppedPlacement {
    pub placement_id: String,
    pub reason: DomainError,
}

#[derive(Debug, Default)]
pub struct DeploymentPlan {
    /// Launched first, in declaration order
    pub standalone: Vec<PlannedPlacement>,
    /// Launched after their parents, in declaration order
    pub composite: Vec<PlannedPlacement>,
    pub dropped: Vec<DroppedPlacement>,
}

/// Plan all placements of a node against the host.
pub fn plan(
    entries: Vec<(Placement, SoftwarePackage)>,
    host: &HostCapabilities,
) -> DeploymentPlan {
    let mut plan = DeploymentPlan::default();

    for (placement, package) in entries {
        match plan_one(&placement, &package, host) {
            Ok(planned) => {
                let is_composite_shared = placement.composite_part_of.is_some()
                    && planned.code_kind == CodeKind::SharedLibrary;
                if is_composite_shared {
                    plan.composite.push(planned);
                } else {
                    plan.standalone.push(planned);
                }
            }
            Err(reason) => {
                error!(
                    placement = %placement.display_id(),
                    error = %reason,
                    "skipping instantiation of placement"
                );
                plan.dropped.push(DroppedPlacement {
                    placement_id: placement.display_id().to_string(),
                    reason,
                });
            }
        }
    }

    // A composite part must reference an instantiation of a planned
    // standalone placement; anything else would launch a child with no
    // parent to load it.
    let mut orphaned = Vec::new();
    plan.composite.retain(|planned| {
        let parent_id = planned
            .placement
            .composite_part_of
            .as_deref()
            .unwrap_or_default();
        let parent_exists = plan.standalone.iter().any(|parent| {
            parent
                .placement
                .instantiations
                .iter()
                .any(|inst| inst.id == parent_id)
        });
        if !parent_exists {
            error!(
                placement = %planned.placement.display_id(),
                parent = %parent_id,
                "unable to locate composite parent; skipping instantiation"
            );
            orphaned.push(DroppedPlacement {
                placement_id: planned.placement.display_id().to_string(),
                reason: DomainError::NotFound(format!(
                    "composite parent instantiation '{}'",
                    parent_id
                )),
            });
        }
        parent_exists
    });
    plan.dropped.extend(orphaned);

    debug!(
        standalone = plan.standalone.len(),
        composite = plan.composite.len(),
        dropped = plan.dropped.len(),
        "deployment plan complete"
    );
    plan
}

fn plan_one(
    placement: &Placement,
    package: &SoftwarePackage,
    host: &HostCapabilities,
) -> Result<PlannedPlacement, DomainError> {
    let implementation = match_implementation(package, host)?;
    let resolved_dependencies = resolve_softpkg_dependencies(implementation, host)?;

    let profile = ProgramProfile {
        package: package.clone(),
        properties: merge_properties(&package.properties, &implementation.properties),
    };

    Ok(PlannedPlacement {
        placement: placement.clone(),
        profile,
        implementation_id: implementation.id.clone(),
        code_kind: implementation.code.kind,
        code_path: implementation.code.path.clone(),
        resolved_dependencies,
    })
}
