//! Reusable patch fixtures.
//!
//! - [`ramp_patch`]: every cell holds its own linear offset.
//! - [`global_index_patch`]: every cell holds its linear index in the
//!   enclosing grid `0..=upper`.

use tessera_core::point::{linear_offset, strides};
use tessera_core::{GridVar, SharedVar, VarType};
use tessera_patch::{Patch, PatchConfig};

/// A 4-byte integer variable.
pub fn int_var(name: &str) -> SharedVar {
    GridVar::new(name, VarType::Int32, 1).into_shared()
}

/// Patch over `0..=upper` with one `Int32` variable at position 0 whose
/// value at each cell is its linear offset in the buffer.
pub fn ramp_patch(upper: &[u32], config: PatchConfig) -> Patch {
    let lower = vec![0; upper.len()];
    let mut p = Patch::with_config(&lower, upper, config).expect("valid ramp bounds");
    p.attach(&int_var("ramp"));
    let n = p.cell_count() as i32;
    let values: Vec<i32> = (0..n).collect();
    p.data_handle(0)
        .expect("ramp allocation")
        .write_elements(0, &values);
    p
}

/// Patch over `lower..=upper` with one `Int32` variable at position 0
/// whose value at each cell is that cell's linear index in a grid of
/// extent `upper + 1`.
pub fn global_index_patch(lower: &[u32], upper: &[u32]) -> Patch {
    let mut p = Patch::new(lower, upper).expect("valid fixture bounds");
    p.attach(&int_var("index"));
    let global: Vec<u32> = upper.iter().map(|&u| u + 1).collect();
    let gs = strides(&global);
    let mut values = Vec::with_capacity(p.cell_count() as usize);
    let mut k = lower.to_vec();
    for _ in 0..p.cell_count() {
        values.push(linear_offset(&k, &gs) as i32);
        for i in 0..k.len() {
            k[i] += 1;
            if k[i] <= upper[i] {
                break;
            }
            k[i] = lower[i];
        }
    }
    p.data_handle(0)
        .expect("fixture allocation")
        .write_elements(0, &values);
    p
}

