use tracing::*;

use crate::{
    errors::{AppResult, AutoSoundError},
    platform::{AudioPlatform, DefaultEndpointWriter, Role},
};

use super::session::EndpointSession;

/// Makes `endpoint_id` the default for every role, Console then Multimedia then Communications.
///
/// Stops at the first role that fails, reporting it. Roles before it stay applied, there's no
/// rolling back. The ID isn't checked beforehand; Windows gets the final say on whether it exists.
pub fn set_default<P: AudioPlatform>(
    session: &EndpointSession<P>,
    endpoint_id: &str,
) -> AppResult<()> {
    let platform = session.platform()?;

    // Fresh every time, a held one can go stale across device topology changes
    let policy_config =
        platform
            .create_policy_config()
            .map_err(|source| AutoSoundError::ObjectCreation {
                object: "policy config",
                source,
            })?;

    for role in Role::ALL {
        policy_config
            .set_default_endpoint(endpoint_id, role)
            .map_err(|source| AutoSoundError::DefaultAssignment {
                role,
                endpoint_id: endpoint_id.to_owned(),
                source,
            })?;
        trace!("Set {endpoint_id} -> {role}");
    }

    Ok(())
}
