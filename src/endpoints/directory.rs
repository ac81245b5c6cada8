use tracing::*;

use crate::{
    errors::{AppResult, AutoSoundError},
    platform::{
        AudioPlatform, DeviceState, Direction, EndpointCollection, EndpointDevice,
        EndpointEnumerator, Role, StateMask,
    },
};

use super::{session::EndpointSession, Endpoint, UNKNOWN_DEVICE_NAME};

/// Active endpoints for `direction`, in the order Windows hands them to us.
///
/// Only the enumeration call itself can fail this; a device whose details can't be read is either
/// given a placeholder name or, without an ID, skipped.
pub fn list_endpoints<P: AudioPlatform>(
    session: &EndpointSession<P>,
    direction: Direction,
) -> AppResult<Vec<Endpoint>> {
    let enumerator = session.enumerator()?;

    let enumeration_error = |source| AutoSoundError::Enumeration { direction, source };
    let collection = enumerator
        .enum_endpoints(direction, StateMask::ACTIVE)
        .map_err(enumeration_error)?;
    let count = collection.count().map_err(enumeration_error)?;

    let default_id = default_id_for(enumerator, direction);

    let mut endpoints = Vec::with_capacity(count as usize);
    for index in 0..count {
        let device = match collection.item(index) {
            Ok(device) => device,
            Err(e) => {
                warn!("Skipping {direction} device #{index}: {e}");
                continue;
            }
        };
        // Asked for active only, but unplugged devices have slipped through before
        match device.state() {
            Ok(DeviceState::Active) => (),
            Ok(state) => {
                debug!("Skipping {direction} device #{index} in state {state:?}");
                continue;
            }
            Err(e) => debug!("Couldn't read state of {direction} device #{index}: {e}"),
        }
        let id = match device.id() {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping {direction} device #{index}, no ID: {e}");
                continue;
            }
        };
        let name = device.friendly_name().unwrap_or_else(|e| {
            warn!("No friendly name for {id}: {e}");
            String::from(UNKNOWN_DEVICE_NAME)
        });
        let is_system_default = default_id.as_deref() == Some(id.as_str());

        endpoints.push(Endpoint {
            id,
            name,
            direction,
            is_system_default,
        });
    }

    Ok(endpoints)
}

/// ID of the current Multimedia default for `direction`.
///
/// Empty if there is none or Windows won't tell us; only an unopened/closed session is an error.
pub fn current_default_id<P: AudioPlatform>(
    session: &EndpointSession<P>,
    direction: Direction,
) -> AppResult<String> {
    let enumerator = session.enumerator()?;
    Ok(default_id_for(enumerator, direction).unwrap_or_default())
}

fn default_id_for<E: EndpointEnumerator>(enumerator: &E, direction: Direction) -> Option<String> {
    let lookup = enumerator
        .default_endpoint(direction, Role::Multimedia)
        .and_then(|device| device.id());
    match lookup {
        Ok(id) if !id.is_empty() => Some(id),
        Ok(_) => None,
        Err(e) => {
            debug!("No default {direction} device: {e}");
            None
        }
    }
}
