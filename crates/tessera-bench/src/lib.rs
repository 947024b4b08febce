//! Benchmark profiles for Tessera grid patches.
//!
//! - [`cube_profile`]: an `n`³ patch with one seeded `Float64` variable
//! - [`multi_var_profile`]: same geometry with several variables, some left
//!   unallocated
//! - [`scatter_transpose`]: the scatter-store transpose order, kept only as
//!   a baseline for [`tessera_patch::transpose_bytes`]

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::point::strides;
use tessera_core::{GridVar, VarType};
use tessera_patch::{Patch, PatchConfig};

/// Build an `n`×`n`×`n` patch holding one `Float64` variable filled with
/// uniform values in `[0, 1)` drawn from `seed`.
pub fn cube_profile(n: u32, seed: u64, config: PatchConfig) -> Patch {
    let upper = [n - 1; 3];
    let mut patch = Patch::with_config(&[0; 3], &upper, config).unwrap();
    patch.attach(&GridVar::new("field", VarType::Float64, 1).into_shared());
    fill_uniform(&mut patch, 0, seed);
    patch
}

/// Build an `n`³ patch with `vars` `Float64` variables, allocating and
/// filling only the even positions.
pub fn multi_var_profile(n: u32, vars: usize, seed: u64) -> Patch {
    let upper = [n - 1; 3];
    let mut patch = Patch::with_config(&[0; 3], &upper, PatchConfig::serial()).unwrap();
    for i in 0..vars {
        patch.attach(&GridVar::new(format!("v{i}"), VarType::Float64, 1).into_shared());
    }
    for pos in (0..vars).step_by(2) {
        fill_uniform(&mut patch, pos, seed.wrapping_add(pos as u64));
    }
    patch
}

/// Fill the `Float64` variable at `position` with seeded uniform values.
pub fn fill_uniform(patch: &mut Patch, position: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let count = patch.actual_cell_count(position).unwrap() as usize;
    let values: Vec<f64> = (0..count)
        .map(|_| (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64)
        .collect();
    patch
        .data_handle(position)
        .unwrap()
        .write_elements(0, &values);
}

/// Transpose by walking the *source* in memory order and scattering each
/// element to its permuted destination offset.
pub fn scatter_transpose(
    src: &[u8],
    dst: &mut [u8],
    element_size: usize,
    dims: &[u32],
    a: usize,
    b: usize,
) {
    let mut dims_t = dims.to_vec();
    dims_t.swap(a, b);
    let mut scatter = strides(&dims_t);
    scatter.swap(a, b);

    let n = dims.len();
    let mut k = vec![0u32; n];
    for chunk in src.chunks_exact(element_size) {
        let d: usize = k.iter().zip(&scatter).map(|(&c, &s)| c as usize * s).sum();
        dst[d * element_size..(d + 1) * element_size].copy_from_slice(chunk);
        for i in 0..n {
            k[i] += 1;
            if k[i] < dims[i] {
                break;
            }
            k[i] = 0;
        }
    }
}
