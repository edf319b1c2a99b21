// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

use crate::bitmatrix::BitMatrix;

/// A packet of a device within one window of `packet_size * w` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub device: usize,
    pub packet: usize,
}

impl Symbol {
    pub fn new(device: usize, packet: usize) -> Self {
        Self { device, packet }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Copy,
    Xor,
}

/// One packet-sized copy or XOR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub src: Symbol,
    pub dst: Symbol,
    pub kind: OpKind,
}

/// An ordered list of packet operations replayed on every window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub ops: Vec<Operation>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of XOR operations, the cost the smart scheduler minimizes.
    pub fn xor_count(&self) -> usize {
        self.ops.iter().filter(|op| op.kind == OpKind::Xor).count()
    }

    pub fn extend(&mut self, other: Schedule) {
        self.ops.extend(other.ops);
    }

    /// Replays the schedule on every window of the devices.
    ///
    /// # Panics
    ///
    /// Panics if the devices are not a multiple of `packet_size * w` long.
    pub fn apply(&self, devices: &mut [&mut [u8]], packet_size: usize, w: usize) {
        let window = packet_size * w;
        let len = devices.first().map(|d| d.len()).unwrap_or(0);
        assert!(
            window > 0 && len % window == 0,
            "block size {len} is not a multiple of packetsize * w = {window}"
        );
        for base in (0..len).step_by(window) {
            for op in &self.ops {
                let src = base + op.src.packet * packet_size;
                let dst = base + op.dst.packet * packet_size;
                let (s, d) = packet_pair(
                    devices,
                    op.src.device,
                    src,
                    op.dst.device,
                    dst,
                    packet_size,
                );
                match op.kind {
                    OpKind::Copy => d.copy_from_slice(s),
                    OpKind::Xor => crate::galois::xor_region(s, d),
                }
            }
        }
    }
}

/// Borrows a source packet and a distinct destination packet at the same time.
fn packet_pair<'a>(
    devices: &'a mut [&mut [u8]],
    src_dev: usize,
    src: usize,
    dst_dev: usize,
    dst: usize,
    len: usize,
) -> (&'a [u8], &'a mut [u8]) {
    use std::cmp::Ordering;
    match src_dev.cmp(&dst_dev) {
        Ordering::Equal => {
            let buf = &mut *devices[src_dev];
            assert_ne!(src, dst, "operation reads and writes the same packet");
            if src < dst {
                let (a, b) = buf.split_at_mut(dst);
                (&a[src..src + len], &mut b[..len])
            } else {
                let (a, b) = buf.split_at_mut(src);
                (&b[..len], &mut a[dst..dst + len])
            }
        }
        Ordering::Less => {
            let (a, b) = devices.split_at_mut(dst_dev);
            (&a[src_dev][src..src + len], &mut b[0][dst..dst + len])
        }
        Ordering::Greater => {
            let (a, b) = devices.split_at_mut(src_dev);
            (&b[0][src..src + len], &mut a[dst_dev][dst..dst + len])
        }
    }
}

/// Builds a schedule computing `targets[r]` as the XOR of the `sources`
/// selected by bit-row `r`.
///
/// Rows are emitted greedily: the next row is the one that is cheapest to
/// compute either from scratch or from an already computed target plus the
/// differing sources.
pub fn rows_to_schedule(rows: &[&[u8]], sources: &[Symbol], targets: &[Symbol]) -> Schedule {
    assert_eq!(rows.len(), targets.len());
    let ones = |row: &&[u8]| row.iter().filter(|&&b| b != 0).count();
    let distance = |a: &[u8], b: &[u8]| a.iter().zip(b).filter(|(x, y)| x != y).count();

    let n = rows.len();
    let mut done = vec![false; n];
    // (cost, computed row it derives from)
    let mut best: Vec<(usize, Option<usize>)> = rows.iter().map(|r| (ones(r), None)).collect();
    let mut schedule = Schedule::default();

    for _ in 0..n {
        let Some(next) = (0..n).filter(|&r| !done[r]).min_by_key(|&r| best[r].0) else {
            break;
        };
        let row = rows[next];
        let target = targets[next];
        match best[next].1 {
            Some(from) => {
                schedule.ops.push(Operation {
                    src: targets[from],
                    dst: target,
                    kind: OpKind::Copy,
                });
                for (c, (a, b)) in row.iter().zip(rows[from]).enumerate() {
                    if a != b {
                        schedule.ops.push(Operation {
                            src: sources[c],
                            dst: target,
                            kind: OpKind::Xor,
                        });
                    }
                }
            }
            None => {
                let mut set = row.iter().enumerate().filter(|&(_, &b)| b != 0).map(|(c, _)| c);
                match set.next() {
                    Some(first) => {
                        schedule.ops.push(Operation {
                            src: sources[first],
                            dst: target,
                            kind: OpKind::Copy,
                        });
                        for c in set {
                            schedule.ops.push(Operation {
                                src: sources[c],
                                dst: target,
                                kind: OpKind::Xor,
                            });
                        }
                    }
                    // a row without ones yields zero: copy any source and cancel it
                    None => {
                        for kind in [OpKind::Copy, OpKind::Xor] {
                            schedule.ops.push(Operation {
                                src: sources[0],
                                dst: target,
                                kind,
                            });
                        }
                    }
                }
            }
        }
        done[next] = true;

        for r in 0..n {
            if !done[r] {
                let d = distance(rows[r], row);
                if d < best[r].0 {
                    best[r] = (d, Some(next));
                }
            }
        }
    }
    schedule
}

/// Encoding schedule of a `k`-data-device bit-matrix.
pub fn bitmatrix_to_schedule(k: usize, w: usize, bitmatrix: &BitMatrix) -> Schedule {
    let sources: Vec<Symbol> = (0..k * w).map(|c| Symbol::new(c / w, c % w)).collect();
    let targets: Vec<Symbol> = (0..bitmatrix.rows)
        .map(|r| Symbol::new(k + r / w, r % w))
        .collect();
    let rows: Vec<&[u8]> = (0..bitmatrix.rows).map(|r| bitmatrix.row(r)).collect();
    rows_to_schedule(&rows, &sources, &targets)
}
