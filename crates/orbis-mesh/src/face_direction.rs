//! Voxel face directions and the unit-cube quad each one emits.

/// Axis-aligned direction a voxel face looks toward.
///
/// The discriminant indexes [`FACE_CORNERS`] and is stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FaceDirection {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

/// Unit-cube corners for each face, ordered so that `(c0, c1, c2)` and
/// `(c2, c1, c3)` are counter-clockwise when viewed from outside the cube.
///
/// Each row is `a, a+u, a+v, a+u+v` with `u × v` equal to the face normal.
const FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // +X: u = Y, v = Z
    [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0]],
    // −X: u = Z, v = Y
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0]],
    // +Y: u = Z, v = X
    [[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
    // −Y: u = X, v = Z
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]],
    // +Z: u = X, v = Y
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
    // −Z: u = Y, v = X
    [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
];

/// Index pattern for the two triangles of a quad, relative to its first vertex.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

impl FaceDirection {
    /// Mesher visiting order.
    pub const ALL: [FaceDirection; 6] = [
        FaceDirection::PosX,
        FaceDirection::NegX,
        FaceDirection::PosY,
        FaceDirection::NegY,
        FaceDirection::PosZ,
        FaceDirection::NegZ,
    ];

    /// Lattice step from a cell to the neighbour behind this face.
    pub fn step(self) -> [i32; 3] {
        match self {
            FaceDirection::PosX => [1, 0, 0],
            FaceDirection::NegX => [-1, 0, 0],
            FaceDirection::PosY => [0, 1, 0],
            FaceDirection::NegY => [0, -1, 0],
            FaceDirection::PosZ => [0, 0, 1],
            FaceDirection::NegZ => [0, 0, -1],
        }
    }

    /// Outward unit normal.
    pub fn normal(self) -> [f32; 3] {
        self.step().map(|c| c as f32)
    }

    /// Cell coordinates of the neighbour across this face.
    pub fn offset(self, x: i32, y: i32, z: i32) -> (i32, i32, i32) {
        let [dx, dy, dz] = self.step();
        (x + dx, y + dy, z + dz)
    }

    /// The four unit-cube corners of this face, in quad order.
    pub fn corners(self) -> &'static [[f32; 3]; 4] {
        &FACE_CORNERS[self as usize]
    }
}
