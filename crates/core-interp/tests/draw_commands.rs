//! Coverage for the device pass-through drawing commands.

mod common;

use common::run_script;
use core_device::recording::DeviceOp;

#[test]
fn icon_draws_at_each_moveto() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 100, 100\n",
        "move 10, 10\nmove 20, 20\n",
        "icon \"well.png\", 6\n",
    ));
    let op = h
        .ops()
        .into_iter()
        .find(|o| matches!(o, DeviceOp::DrawIcon { .. }))
        .expect("icon op");
    assert_eq!(
        op,
        DeviceOp::DrawIcon {
            points: 2,
            image: "well.png".to_string(),
            size: 6.0
        }
    );
}

#[test]
fn placed_files_pass_through() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 100, 100\n",
        "move 50, 50\n",
        "eps \"north-arrow.eps\"\n",
        "svg \"scalebar.svg\", 25\n",
        "pdf \"inset.pdf\", 40\n",
    ));
    let kinds: Vec<&'static str> = h
        .ops()
        .into_iter()
        .filter_map(|o| match o {
            DeviceOp::DrawFile { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["eps", "svg", "pdf"]);
}

#[test]
fn svgcode_and_eventscript_pass_through() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 100, 100\n",
        "svgcode \"<g id='overlay'/>\"\n",
        "box 10, 10, 20, 20\n",
        "eventscript \"onclick=zoom()\"\n",
    ));
    let ops = h.ops();
    assert!(
        ops.iter()
            .any(|o| matches!(o, DeviceOp::SvgCode(s) if s.contains("overlay")))
    );
    assert!(
        ops.iter()
            .any(|o| matches!(o, DeviceOp::EventScript(s) if s == "onclick=zoom()"))
    );
}

#[test]
fn gradient_fill_parses_both_colors() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 100, 100\n",
        "box 0, 0, 100, 100\n",
        "gradientfill \"white\", \"navy\", \"vertical\"\n",
    ));
    let op = h
        .ops()
        .into_iter()
        .find(|o| matches!(o, DeviceOp::GradientFill { .. }))
        .expect("gradient op");
    match op {
        DeviceOp::GradientFill { vertical, c1, c2 } => {
            assert!(vertical);
            assert_eq!(c1, core_device::Color::WHITE);
            assert_eq!(c2, core_device::Color::rgb(0, 0, 128));
        }
        _ => unreachable!(),
    }
}

#[test]
fn flowlabel_places_each_character() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 100, 100\n",
        "font \"SansSerif\", 5\n",
        "move 10, 50\ndraw 90, 50\n",
        "flowlabel 0, \"ROAD\"\n",
    ));
    let labels: Vec<(Vec<(f64, f64)>, String)> = h
        .ops()
        .into_iter()
        .filter_map(|o| match o {
            DeviceOp::Label { points, text } => Some((points, text)),
            _ => None,
        })
        .collect();
    assert_eq!(labels.len(), 4, "one label per character: {labels:?}");
    let texts: String = labels.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(texts, "ROAD");
    // Characters advance along the baseline.
    let xs: Vec<f64> = labels.iter().map(|(p, _)| p[0].0).collect();
    assert!(xs.windows(2).all(|w| w[0] < w[1]), "{xs:?}");
    assert!(labels.iter().all(|(p, _)| (p[0].1 - 50.0).abs() < 1e-6));
}

#[test]
fn table_strokes_cells_and_labels_values() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 200, 100\n",
        "let col[\"1\"] = \"name\"\nlet col[\"2\"] = \"depth\"\n",
        "move 10, 90\n",
        "table \"\", col\n",
    ));
    let ops = h.ops();
    let strokes = ops
        .iter()
        .filter(|o| matches!(o, DeviceOp::Stroke { .. }))
        .count();
    assert_eq!(strokes, 2, "one cell box per map entry");
    let labels: Vec<String> = ops
        .iter()
        .filter_map(|o| match o {
            DeviceOp::Label { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(labels, vec!["name", "depth"]);
}

#[test]
fn tree_indents_nested_maps() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 200, 100\n",
        "let leaf[\"wells\"] = 3\n",
        "let root[\"layers\"] = leaf\n",
        "move 10, 90\n",
        "tree \"\", root\n",
    ));
    let labels: Vec<(Vec<(f64, f64)>, String)> = h
        .ops()
        .into_iter()
        .filter_map(|o| match o {
            DeviceOp::Label { points, text } => Some((points, text)),
            _ => None,
        })
        .collect();
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].1, "layers");
    assert_eq!(labels[1].1, "wells 3");
    // The child is indented and one row down.
    assert!(labels[1].0[0].0 > labels[0].0[0].0);
    assert!(labels[1].0[0].1 < labels[0].0[0].1);
}

#[test]
fn blend_flushes_before_drawing() {
    let h = run_script(concat!(
        "newpage \"svg\", \"-\", 100, 100\n",
        "blend \"Multiply\"\n",
        "box 0, 0, 10, 10\nfill\n",
    ));
    let ops = h.ops();
    let fill_at = ops
        .iter()
        .position(|o| matches!(o, DeviceOp::Fill { .. }))
        .unwrap();
    assert!(
        ops[..fill_at]
            .iter()
            .any(|o| matches!(o, DeviceOp::SetBlend(m) if m == "Multiply"))
    );
}
