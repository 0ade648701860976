/// Frame Plan
///
/// The command sequence of one frame as plain data. Every phase boundary
/// is a full barrier: all writes of a phase are visible to every later
/// phase. The orchestrator records a plan; tests inspect it directly.
use super::render_mode::RenderMode;
use crate::constants::octree::{LEVEL_COUNT, START_LEVEL};
use crate::visibility::depth_pyramid_operations::reduction_sources;

/// Copy-engine resets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    ClearPixelLocks,
    ClearColor,
    ResetSpanCounter,
    ResetDrawArgs,
    ClearOctreeCounters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeOp {
    FillPyramid,
    FillEmptyDepth,
    FillOctreeCells,
    ScanlineInit,
    ScanlineWork,
    ReducePyramid { source_level: u32 },
    BuildOctree,
    TestTriangles,
    TestOctreeLevel { level: u32 },
}

/// One draw, each in its own render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOp {
    Wireframe,
    MeshDepth,
    MeshShade,
    ScanlineBlit,
    SurvivorDepth,
    SurvivorShade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseWork {
    Transfer(Vec<TransferOp>),
    Compute(Vec<ComputeOp>),
    Render(RenderOp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePhase {
    pub label: &'static str,
    pub work: PhaseWork,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub mode: RenderMode,
    pub phases: Vec<FramePhase>,
}

fn transfer(label: &'static str, ops: Vec<TransferOp>) -> FramePhase {
    FramePhase {
        label,
        work: PhaseWork::Transfer(ops),
    }
}

fn compute(label: &'static str, ops: Vec<ComputeOp>) -> FramePhase {
    FramePhase {
        label,
        work: PhaseWork::Compute(ops),
    }
}

fn render(label: &'static str, op: RenderOp) -> FramePhase {
    FramePhase {
        label,
        work: PhaseWork::Render(op),
    }
}

/// Build the phases for `mode` on a pyramid with `mip_count` levels
pub fn build_frame_plan(mode: RenderMode, mip_count: u32) -> FramePlan {
    let mut phases = Vec::new();

    match mode {
        RenderMode::Wireframe => {
            phases.push(compute("Reset", vec![ComputeOp::FillPyramid]));
            phases.push(render("Wireframe", RenderOp::Wireframe));
        }
        RenderMode::NaiveZ => {
            phases.push(compute("Reset", vec![ComputeOp::FillPyramid]));
            phases.push(render("Naive Z Depth", RenderOp::MeshDepth));
            phases.push(render("Naive Z Shade", RenderOp::MeshShade));
        }
        RenderMode::Scanline => {
            phases.push(transfer(
                "Scanline Reset",
                vec![
                    TransferOp::ClearPixelLocks,
                    TransferOp::ClearColor,
                    TransferOp::ResetSpanCounter,
                ],
            ));
            phases.push(compute("Reset", vec![ComputeOp::FillPyramid]));
            phases.push(compute("Scanline Init", vec![ComputeOp::ScanlineInit]));
            phases.push(compute("Scanline Work", vec![ComputeOp::ScanlineWork]));
            phases.push(render("Scanline Blit", RenderOp::ScanlineBlit));
        }
        RenderMode::NaiveHiZ | RenderMode::OptimHiZ => {
            let optimized = mode == RenderMode::OptimHiZ;

            let mut transfers = vec![TransferOp::ResetDrawArgs];
            let mut fills = vec![ComputeOp::FillPyramid, ComputeOp::FillEmptyDepth];
            if optimized {
                transfers.push(TransferOp::ClearOctreeCounters);
                fills.push(ComputeOp::FillOctreeCells);
            }
            phases.push(transfer("Hi-Z Reset", transfers));
            phases.push(compute("Reset", fills));
            phases.push(render("Z-Prepass", RenderOp::MeshDepth));

            for source_level in reduction_sources(mip_count) {
                phases.push(compute(
                    "Pyramid Reduction",
                    vec![ComputeOp::ReducePyramid { source_level }],
                ));
            }

            if optimized {
                phases.push(compute("Octree Build", vec![ComputeOp::BuildOctree]));
                for level in START_LEVEL..LEVEL_COUNT {
                    phases.push(compute(
                        "Octree Level Test",
                        vec![ComputeOp::TestOctreeLevel { level }],
                    ));
                }
            } else {
                phases.push(compute("Triangle Test", vec![ComputeOp::TestTriangles]));
            }

            phases.push(render("Hi-Z Depth", RenderOp::SurvivorDepth));
            phases.push(render("Hi-Z Shade", RenderOp::SurvivorShade));
        }
    }

    FramePlan { mode, phases }
}

pub fn count_dispatches(plan: &FramePlan) -> usize {
    plan.phases
        .iter()
        .map(|phase| match &phase.work {
            PhaseWork::Compute(ops) => ops.len(),
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(plan: &FramePlan, predicate: impl Fn(&PhaseWork) -> bool) -> Option<usize> {
        plan.phases.iter().position(|phase| predicate(&phase.work))
    }

    fn has_compute(work: &PhaseWork, op: ComputeOp) -> bool {
        matches!(work, PhaseWork::Compute(ops) if ops.contains(&op))
    }

    fn has_transfer(work: &PhaseWork, op: TransferOp) -> bool {
        matches!(work, PhaseWork::Transfer(ops) if ops.contains(&op))
    }

    #[test]
    fn test_every_mode_resets_pyramid_first() {
        for mode in RenderMode::ALL {
            let plan = build_frame_plan(mode, 11);
            let fill = position(&plan, |w| has_compute(w, ComputeOp::FillPyramid)).unwrap();
            let first_consumer = plan
                .phases
                .iter()
                .position(|p| matches!(p.work, PhaseWork::Render(_)) || {
                    matches!(&p.work, PhaseWork::Compute(ops) if !ops.contains(&ComputeOp::FillPyramid))
                })
                .unwrap();
            assert!(fill < first_consumer, "{:?}", mode);
        }
    }

    #[test]
    fn test_buffers_cleared_only_where_needed() {
        for mode in RenderMode::ALL {
            let plan = build_frame_plan(mode, 11);
            let locks = position(&plan, |w| has_transfer(w, TransferOp::ClearPixelLocks));
            let empty = position(&plan, |w| has_compute(w, ComputeOp::FillEmptyDepth));
            let octree = position(&plan, |w| has_compute(w, ComputeOp::FillOctreeCells));
            assert_eq!(locks.is_some(), mode == RenderMode::Scanline);
            assert_eq!(empty.is_some(), mode.is_hierarchical());
            assert_eq!(octree.is_some(), mode == RenderMode::OptimHiZ);
        }
    }

    #[test]
    fn test_scanline_phases_are_ordered() {
        let plan = build_frame_plan(RenderMode::Scanline, 11);
        let reset = position(&plan, |w| has_transfer(w, TransferOp::ResetSpanCounter)).unwrap();
        let init = position(&plan, |w| has_compute(w, ComputeOp::ScanlineInit)).unwrap();
        let work = position(&plan, |w| has_compute(w, ComputeOp::ScanlineWork)).unwrap();
        let blit = position(&plan, |w| *w == PhaseWork::Render(RenderOp::ScanlineBlit)).unwrap();
        assert!(reset < init && init < work && work < blit);
    }

    #[test]
    fn test_reduction_follows_prepass_and_precedes_tests() {
        for mode in [RenderMode::NaiveHiZ, RenderMode::OptimHiZ] {
            let plan = build_frame_plan(mode, 11);
            let prepass = position(&plan, |w| *w == PhaseWork::Render(RenderOp::MeshDepth)).unwrap();
            let reductions: Vec<usize> = plan
                .phases
                .iter()
                .enumerate()
                .filter(|(_, p)| matches!(&p.work, PhaseWork::Compute(ops) if matches!(ops[0], ComputeOp::ReducePyramid { .. })))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(reductions.len(), 3);
            let first_test = plan
                .phases
                .iter()
                .position(|p| {
                    has_compute(&p.work, ComputeOp::TestTriangles)
                        || matches!(&p.work, PhaseWork::Compute(ops) if matches!(ops[0], ComputeOp::TestOctreeLevel { .. }))
                })
                .unwrap();
            assert!(prepass < reductions[0]);
            assert!(*reductions.last().unwrap() < first_test);
        }
    }

    #[test]
    fn test_octree_levels_one_phase_each_coarse_to_fine() {
        let plan = build_frame_plan(RenderMode::OptimHiZ, 11);
        let levels: Vec<u32> = plan
            .phases
            .iter()
            .filter_map(|p| match &p.work {
                PhaseWork::Compute(ops) => match ops.as_slice() {
                    [ComputeOp::TestOctreeLevel { level }] => Some(*level),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(levels, (START_LEVEL..LEVEL_COUNT).collect::<Vec<_>>());

        let build = position(&plan, |w| has_compute(w, ComputeOp::BuildOctree)).unwrap();
        let first_level = position(&plan, |w| {
            has_compute(w, ComputeOp::TestOctreeLevel { level: START_LEVEL })
        })
        .unwrap();
        assert!(build < first_level);
    }

    #[test]
    fn test_single_mip_has_no_reduction() {
        let plan = build_frame_plan(RenderMode::NaiveHiZ, 1);
        assert!(position(&plan, |w| has_compute(w, ComputeOp::ReducePyramid { source_level: 0 })).is_none());
        assert!(position(&plan, |w| has_compute(w, ComputeOp::TestTriangles)).is_some());
    }

    #[test]
    fn test_survivor_draw_ends_hiz_frames() {
        for mode in [RenderMode::NaiveHiZ, RenderMode::OptimHiZ] {
            let plan = build_frame_plan(mode, 6);
            let tail: Vec<&PhaseWork> = plan.phases.iter().rev().take(2).map(|p| &p.work).collect();
            assert_eq!(tail[0], &PhaseWork::Render(RenderOp::SurvivorShade));
            assert_eq!(tail[1], &PhaseWork::Render(RenderOp::SurvivorDepth));
        }
        // 2 fills plus octree fill, 2 reductions, build, 5 levels
        assert_eq!(count_dispatches(&build_frame_plan(RenderMode::OptimHiZ, 6)), 3 + 2 + 1 + 5);
    }
}
