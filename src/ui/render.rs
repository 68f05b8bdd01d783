//! ui::render
//!
//! ASCII rendering of a lane-annotated graph.
//!
//! One line per row: lane glyphs in fixed columns, then the abbreviated
//! id and subject. This is a terminal affordance for inspecting lane
//! assignments; graphical clients draw from the same `Lane` markers.
//!
//! ```text
//! *    f4a1b2c merge feature
//! * \  d00dfee tip of mainline
//! | *  0ff1ce0 feature work
//! * /  c0ffee1 common ancestor
//! ```

use crate::cache::{GraphSnapshot, LaneKind};

use super::output::format_commit;

/// Glyph for one lane marker. The working-tree row uses `@` for its
/// commit point.
fn glyph(kind: LaneKind, working_tree: bool) -> char {
    match kind {
        LaneKind::Commit | LaneKind::Root | LaneKind::Fork => {
            if working_tree {
                '@'
            } else {
                '*'
            }
        }
        LaneKind::Through => '|',
        LaneKind::ForkOut => '\\',
        LaneKind::Join => '/',
        LaneKind::Empty => ' ',
    }
}

/// Render the whole graph, one line per row.
pub fn render_graph(snapshot: &GraphSnapshot) -> String {
    let width = snapshot.max_lane_width();
    let mut out = String::new();

    for node in snapshot.iter() {
        let wip = node.record.is_working_tree();

        let mut lanes = String::with_capacity(width * 2);
        for index in 0..width {
            let ch = node
                .lanes
                .get(index)
                .map(|lane| glyph(lane.kind, wip))
                .unwrap_or(' ');
            lanes.push(ch);
            lanes.push(' ');
        }

        out.push_str(&lanes);
        out.push(' ');
        out.push_str(&format_commit(node.record.id(), node.record.short_log()));
        if node.parent_missing {
            out.push_str(" [history truncated]");
        }
        out.push('\n');
    }

    out
}
