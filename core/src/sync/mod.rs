//! Wire protocol between the authoritative host and observers.
//!
//! Hand-rolled fixed-width little-endian frames behind a one-byte kind
//! discriminant. The transport is owned by the embedding; this module only
//! turns messages into byte payloads and back.

pub mod cache;

use thiserror::Error;

use crate::encounter::WeaponSig;
use crate::world::{EntityId, PlayerId};

pub use cache::ObserverCache;

const KIND_MODIFIERS: u8 = 0;
const KIND_DAMAGE_REPORT: u8 = 1;
const KIND_ADAPTATION: u8 = 2;
const KIND_SCALING_DISABLED: u8 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("message truncated: needed {needed} more byte(s)")]
    ShortRead { needed: usize },
    #[error("unknown message kind {0}")]
    UnknownKind(u8),
}

/// One sync frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncMessage {
    /// Host to observers: current pace modifiers for one boss entity.
    Modifiers {
        entity: EntityId,
        defense: f32,
        offense: f32,
    },
    /// Observer to host: damage the local player dealt to a boss. The
    /// host attributes it to the transport-level sender, so the frame
    /// itself carries no player id.
    DamageReport {
        entity: EntityId,
        weapon: WeaponSig,
        amount: f32,
    },
    /// Host to observers: a tightened weapon factor for one player.
    Adaptation {
        entity: EntityId,
        player: PlayerId,
        weapon: WeaponSig,
        factor: f32,
    },
    /// Host to observers: whether scaling is suppressed for one entity.
    ScalingDisabled { entity: EntityId, disabled: bool },
}

impl SyncMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(17);
        match *self {
            SyncMessage::Modifiers { entity, defense, offense } => {
                out.push(KIND_MODIFIERS);
                out.extend_from_slice(&entity.0.to_le_bytes());
                out.extend_from_slice(&defense.to_le_bytes());
                out.extend_from_slice(&offense.to_le_bytes());
            }
            SyncMessage::DamageReport { entity, weapon, amount } => {
                out.push(KIND_DAMAGE_REPORT);
                out.extend_from_slice(&entity.0.to_le_bytes());
                out.extend_from_slice(&weapon.0.to_le_bytes());
                out.extend_from_slice(&amount.to_le_bytes());
            }
            SyncMessage::Adaptation { entity, player, weapon, factor } => {
                out.push(KIND_ADAPTATION);
                out.extend_from_slice(&entity.0.to_le_bytes());
                out.extend_from_slice(&player.0.to_le_bytes());
                out.extend_from_slice(&weapon.0.to_le_bytes());
                out.extend_from_slice(&factor.to_le_bytes());
            }
            SyncMessage::ScalingDisabled { entity, disabled } => {
                out.push(KIND_SCALING_DISABLED);
                out.extend_from_slice(&entity.0.to_le_bytes());
                out.push(u8::from(disabled));
            }
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let (kind, mut rest) = bytes
            .split_first()
            .ok_or(WireError::ShortRead { needed: 1 })?;
        let msg = match *kind {
            KIND_MODIFIERS => SyncMessage::Modifiers {
                entity: EntityId(read_u32(&mut rest)?),
                defense: read_f32(&mut rest)?,
                offense: read_f32(&mut rest)?,
            },
            KIND_DAMAGE_REPORT => SyncMessage::DamageReport {
                entity: EntityId(read_u32(&mut rest)?),
                weapon: WeaponSig(read_i32(&mut rest)?),
                amount: read_f32(&mut rest)?,
            },
            KIND_ADAPTATION => SyncMessage::Adaptation {
                entity: EntityId(read_u32(&mut rest)?),
                player: PlayerId(read_u32(&mut rest)?),
                weapon: WeaponSig(read_i32(&mut rest)?),
                factor: read_f32(&mut rest)?,
            },
            KIND_SCALING_DISABLED => SyncMessage::ScalingDisabled {
                entity: EntityId(read_u32(&mut rest)?),
                disabled: read_u8(&mut rest)? != 0,
            },
            other => return Err(WireError::UnknownKind(other)),
        };
        Ok(msg)
    }
}

fn take<const N: usize>(rest: &mut &[u8]) -> Result<[u8; N], WireError> {
    if rest.len() < N {
        return Err(WireError::ShortRead { needed: N - rest.len() });
    }
    let (head, tail) = rest.split_at(N);
    *rest = tail;
    let mut buf = [0u8; N];
    buf.copy_from_slice(head);
    Ok(buf)
}

fn read_u8(rest: &mut &[u8]) -> Result<u8, WireError> {
    Ok(take::<1>(rest)?[0])
}

fn read_u32(rest: &mut &[u8]) -> Result<u32, WireError> {
    Ok(u32::from_le_bytes(take::<4>(rest)?))
}

fn read_i32(rest: &mut &[u8]) -> Result<i32, WireError> {
    Ok(i32::from_le_bytes(take::<4>(rest)?))
}

fn read_f32(rest: &mut &[u8]) -> Result<f32, WireError> {
    Ok(f32::from_le_bytes(take::<4>(rest)?))
}
