// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: saving and reloading models on disk.

use model_ir::{
    AttributeValue, Graph, Initializer, Model, ModelError, ModelLoader, ModelSaver, Node,
    SaveLayout, SaveOptions, ValueInfo,
};
use tensor_core::{DType, Shape, Tensor};

// ── Helpers ────────────────────────────────────────────────────

fn sample_graph() -> Graph {
    let mut g = Graph::new("sample");
    g.inputs.push(ValueInfo::with_dims("x", DType::F32, &[1, 3]));
    g.initializers.push(Initializer::new(
        "w",
        Tensor::from_f32(Shape::matrix(3, 2), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
    ));
    g.initializers.push(Initializer::new(
        "ids",
        Tensor::from_bytes(Shape::vector(2), DType::I64, vec![0; 16]).unwrap(),
    ));
    g.nodes.push(Node::new("MatMul", "mm", ["x", "w"], ["y"]));

    let mut body = Graph::new("then");
    body.nodes.push(
        Node::new("Constant", "k", Vec::<String>::new(), ["k_out"])
            .with_attribute("value", AttributeValue::Tensor(Tensor::scalar_f32(0.5))),
    );
    body.nodes.push(Node::new("Mul", "scale", ["y", "k_out"], ["t"]));
    body.outputs.push(ValueInfo::new("t", DType::F32));

    g.inputs.push(ValueInfo::new("cond", DType::Bool));
    g.nodes.push(
        Node::new("If", "branch", ["cond"], ["z"])
            .with_attribute("then_branch", AttributeValue::Graph(body.clone()))
            .with_attribute("else_branch", AttributeValue::Graph(body)),
    );
    g.outputs.push(ValueInfo::new("z", DType::F32));
    g
}

// ── Tests ──────────────────────────────────────────────────────

#[test]
fn test_inline_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let model = Model::new(sample_graph()).validate().unwrap();
    let layout = ModelSaver::save(&model, &path, &SaveOptions::default()).unwrap();
    assert_eq!(layout, SaveLayout::Inline);
    assert!(!dir.path().join("model.json_data").exists());

    let reloaded = ModelLoader::load(&path).unwrap();
    assert_eq!(reloaded.graph, model.graph);
    assert_eq!(reloaded.opset_imports, model.opset_imports);
}

#[test]
fn test_external_data_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.json");

    let model = Model::new(sample_graph()).validate().unwrap();
    let options = SaveOptions {
        external_data_threshold: 16,
    };
    let layout = ModelSaver::save(&model, &path, &options).unwrap();
    let data_path = dir.path().join("big.json_data");
    assert_eq!(layout, SaveLayout::External { data_path: data_path.clone() });
    assert!(data_path.exists());

    // The JSON document no longer carries the initializer payloads.
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["external_data"]["location"], "big.json_data");
    assert_eq!(doc["model"]["graph"]["initializers"], serde_json::json!([]));

    let reloaded = ModelLoader::load(&path).unwrap();
    assert_eq!(reloaded.graph, model.graph);
    let names: Vec<_> = reloaded.graph.initializers.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["w", "ids"]);
}

#[test]
fn test_resave_inline_removes_stale_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m.json");
    let model = Model::new(sample_graph()).validate().unwrap();

    ModelSaver::save(&model, &path, &SaveOptions { external_data_threshold: 1 }).unwrap();
    assert!(dir.path().join("m.json_data").exists());

    ModelSaver::save(&model, &path, &SaveOptions::default()).unwrap();
    assert!(!dir.path().join("m.json_data").exists());
    assert_eq!(ModelLoader::load(&path).unwrap().graph, model.graph);
}

#[test]
fn test_missing_data_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m.json");
    let model = Model::new(sample_graph()).validate().unwrap();
    ModelSaver::save(&model, &path, &SaveOptions { external_data_threshold: 1 }).unwrap();
    std::fs::remove_file(dir.path().join("m.json_data")).unwrap();

    assert!(matches!(
        ModelLoader::load(&path),
        Err(ModelError::SafeTensors(_))
    ));
}

#[test]
fn test_wrong_root_rejected_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let bare = serde_json::to_string(&sample_graph()).unwrap();
    std::fs::write(&path, bare).unwrap();

    assert!(matches!(
        ModelLoader::load(&path),
        Err(ModelError::WrongRootType { .. })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ModelLoader::load(&dir.path().join("absent.json")),
        Err(ModelError::Io(_))
    ));
}
