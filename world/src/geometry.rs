//! Wall blocks, agent body volumes and the collider ownership registry.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use matrix_maze_core::{
    AgentId, AgentTuning, ArmPose, Aabb, BodyPart, CellCoord, ColliderHandle, ColliderOwner,
    MazeTuning, PartKind, Ray, RayHit,
};
use rand::Rng;

use crate::navigation::NavigationGrid;

/// Solid block of wall geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallBlock {
    handle: ColliderHandle,
    cell: CellCoord,
    bounds: Aabb,
    short: bool,
}

impl WallBlock {
    /// Handle registered for the block.
    #[must_use]
    pub const fn handle(&self) -> ColliderHandle {
        self.handle
    }

    /// Maze cell the block belongs to.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// World-space bounds of the block.
    #[must_use]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Whether the block is a low wall that can be seen and shot over.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        self.short
    }
}

/// Maps collider handles back to the entity that owns them.
#[derive(Clone, Debug, Default)]
pub(crate) struct ColliderRegistry {
    owners: BTreeMap<ColliderHandle, ColliderOwner>,
    next_handle: u32,
}

impl ColliderRegistry {
    pub(crate) fn register(&mut self, owner: ColliderOwner) -> ColliderHandle {
        let handle = ColliderHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        let _ = self.owners.insert(handle, owner);
        handle
    }

    pub(crate) fn release(&mut self, handle: ColliderHandle) {
        let _ = self.owners.remove(&handle);
    }

    pub(crate) fn owner(&self, handle: ColliderHandle) -> Option<ColliderOwner> {
        self.owners.get(&handle).copied()
    }
}

/// Every wall block of the maze.
#[derive(Clone, Debug, Default)]
pub(crate) struct WallField {
    blocks: Vec<WallBlock>,
}

impl WallField {
    /// Builds `grid_scale × grid_scale` blocks for every wall cell.
    ///
    /// Interior blocks are shortened with the configured probability; the
    /// outer ring always stays full height.
    pub(crate) fn build<R>(
        grid: &NavigationGrid,
        tuning: &MazeTuning,
        rng: &mut R,
        registry: &mut ColliderRegistry,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let scale = grid.grid_scale().max(1);
        let columns = grid.width() * scale;
        let rows = grid.height() * scale;
        let size = grid.cell_size();
        let half = size * 0.5;

        let mut blocks = Vec::new();
        for block_row in 0..rows {
            for block_column in 0..columns {
                let cell = CellCoord::new(block_column / scale, block_row / scale);
                if grid.is_path(cell) {
                    continue;
                }

                let border = block_column == 0
                    || block_row == 0
                    || block_column + 1 == columns
                    || block_row + 1 == rows;
                let short = !border && rng.gen::<f32>() < tuning.short_wall_chance;
                let height = if short {
                    tuning.short_wall_height
                } else {
                    tuning.wall_height
                };

                let center = Vec3::new(
                    (block_column as f32 - columns as f32 / 2.0 + 0.5) * size,
                    height * 0.5,
                    (block_row as f32 - rows as f32 / 2.0 + 0.5) * size,
                );
                let bounds = Aabb::from_center(center, Vec3::new(half, height * 0.5, half));
                let handle = registry.register(ColliderOwner::Wall { cell });
                blocks.push(WallBlock {
                    handle,
                    cell,
                    bounds,
                    short,
                });
            }
        }

        Self { blocks }
    }

    pub(crate) fn blocks(&self) -> &[WallBlock] {
        &self.blocks
    }

    /// Nearest wall struck by the ray.
    pub(crate) fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        self.blocks
            .iter()
            .filter_map(|block| {
                ray.intersect_aabb(&block.bounds).map(|distance| RayHit {
                    handle: block.handle,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Parts every agent is assembled from, in registration order.
pub(crate) const PART_KINDS: [PartKind; 5] = [
    PartKind::Body,
    PartKind::Head,
    PartKind::LeftArm,
    PartKind::RightArm,
    PartKind::Gun,
];

/// Registers one collider per body part for a new agent.
pub(crate) fn register_parts(
    registry: &mut ColliderRegistry,
    agent: AgentId,
) -> [(PartKind, ColliderHandle); 5] {
    PART_KINDS.map(|part| (part, registry.register(ColliderOwner::Agent { agent, part })))
}

/// Box attached to a pivot that may swing around the agent's lateral axis.
struct PartShape {
    pivot: Vec3,
    swing: f32,
    offset: Vec3,
    half_extents: Vec3,
}

fn part_shape(tuning: &AgentTuning, arms: ArmPose, kind: PartKind) -> PartShape {
    let arm_half = Vec3::new(
        tuning.arm_width * 0.5,
        tuning.arm_length * 0.5,
        tuning.arm_width * 0.5,
    );
    let left_shoulder = Vec3::new(tuning.arm_offset_x, tuning.arm_pivot_y, 0.0);
    let right_shoulder = Vec3::new(-tuning.arm_offset_x, tuning.arm_pivot_y, 0.0);

    match kind {
        PartKind::Body => PartShape {
            pivot: Vec3::new(0.0, tuning.body_height * 0.5, 0.0),
            swing: 0.0,
            offset: Vec3::ZERO,
            half_extents: Vec3::new(
                tuning.body_width * 0.5,
                tuning.body_height * 0.5,
                tuning.body_width * tuning.body_depth_factor * 0.5,
            ),
        },
        PartKind::Head => PartShape {
            pivot: Vec3::new(0.0, tuning.head_height(), 0.0),
            swing: 0.0,
            offset: Vec3::ZERO,
            half_extents: Vec3::splat(tuning.head_size * 0.5),
        },
        PartKind::LeftArm => PartShape {
            pivot: left_shoulder,
            swing: arms.left,
            offset: Vec3::new(0.0, -tuning.arm_length * 0.5, 0.0),
            half_extents: arm_half,
        },
        PartKind::RightArm => PartShape {
            pivot: right_shoulder,
            swing: arms.right,
            offset: Vec3::new(0.0, -tuning.arm_length * 0.5, 0.0),
            half_extents: arm_half,
        },
        PartKind::Gun => PartShape {
            pivot: right_shoulder,
            swing: arms.right,
            offset: Vec3::new(0.0, -(tuning.arm_length + tuning.muzzle_offset * 0.5), 0.0),
            half_extents: Vec3::new(
                tuning.arm_width * 0.75,
                tuning.muzzle_offset * 0.5,
                tuning.arm_width * 0.75,
            ),
        },
    }
}

fn to_world(position: Vec3, yaw: f32, pivot: Vec3, swing: f32, local: Vec3) -> Vec3 {
    position + Quat::from_rotation_y(yaw) * (pivot + Quat::from_rotation_x(swing) * local)
}

/// World-space bounds of a single body part.
pub(crate) fn part_bounds(
    tuning: &AgentTuning,
    position: Vec3,
    yaw: f32,
    arms: ArmPose,
    kind: PartKind,
) -> Aabb {
    let shape = part_shape(tuning, arms, kind);
    let half = shape.half_extents;
    let corners = [-1.0_f32, 1.0].into_iter().flat_map(|x| {
        [-1.0_f32, 1.0].into_iter().flat_map(move |y| {
            [-1.0_f32, 1.0]
                .into_iter()
                .map(move |z| Vec3::new(x, y, z) * half)
        })
    });
    let points = corners.map(|corner| {
        to_world(
            position,
            yaw,
            shape.pivot,
            shape.swing,
            shape.offset + corner,
        )
    });
    Aabb::from_points(points).unwrap_or_else(|| Aabb::new(position, position))
}

/// Collision volumes for every registered part of an agent.
pub(crate) fn body_parts(
    tuning: &AgentTuning,
    position: Vec3,
    yaw: f32,
    arms: ArmPose,
    handles: &[(PartKind, ColliderHandle)],
) -> Vec<BodyPart> {
    handles
        .iter()
        .map(|&(kind, handle)| BodyPart {
            handle,
            kind,
            bounds: part_bounds(tuning, position, yaw, arms, kind),
        })
        .collect()
}

/// Point projectiles leave an agent's weapon.
pub(crate) fn muzzle_point(tuning: &AgentTuning, position: Vec3, yaw: f32, arms: ArmPose) -> Vec3 {
    let shoulder = Vec3::new(-tuning.arm_offset_x, tuning.arm_pivot_y, 0.0);
    let reach = Vec3::new(0.0, -(tuning.arm_length + tuning.muzzle_offset), 0.0);
    to_world(position, yaw, shoulder, arms.right, reach)
}

/// Point an agent looks from.
pub(crate) fn head_point(tuning: &AgentTuning, position: Vec3) -> Vec3 {
    position + Vec3::new(0.0, tuning.head_height(), 0.0)
}
