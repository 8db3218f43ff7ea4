//! End-to-end compilation against the shipped template set

use std::fs;
use std::path::{Path, PathBuf};

use model2code_core::{Document, query};
use model2code_skills::{Pipeline, PipelineMode, PipelineState};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::TempDir;

static LEFTOVER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*[A-Z][A-Z0-9_]*\*/|#[A-Z][A-Z0-9_]*#|<!--[A-Z][A-Z0-9_]*-->").unwrap()
});
static LEFTOVER_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[A-Za-z][A-Za-z_.>-]*\$").unwrap());

const CONDITION_SKILL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<scxml name="NavSkill" initial="idle" datamodel="ecmascript">
    <ros_service_server service_name="/NavSkill/tick" type="bt_interfaces_dummy/TickCondition"/>
    <ros_service_client service_name="/Nav/GetPose" type="nav_interfaces/srv/GetPose"/>
    <datamodel>
        <data id="pose" type="string" expr="''"/>
    </datamodel>
    <state id="idle">
        <ros_service_handle_request name="/NavSkill/tick" target="query"/>
    </state>
    <state id="query">
        <onentry>
            <ros_service_send_request name="/Nav/GetPose">
                <field name="frame_id" expr="'map'"/>
            </ros_service_send_request>
        </onentry>
        <ros_service_handle_response name="/Nav/GetPose" target="idle">
            <assign location="pose" expr="_res.pose"/>
            <ros_service_send_response name="/NavSkill/tick">
                <field name="status" expr="SUCCESS"/>
            </ros_service_send_response>
        </ros_service_handle_response>
    </state>
</scxml>
"#;

const ACTION_SKILL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<scxml name="GotoSkill" initial="idle" datamodel="ecmascript">
    <ros_service_server service_name="/GotoSkill/tick" type="bt_interfaces_dummy/TickAction"/>
    <ros_service_server service_name="/GotoSkill/halt" type="bt_interfaces_dummy/HaltAction"/>
    <ros_action_client name="nav_goal" action_name="/Nav/Goto" type="nav_interfaces/action/Goto"/>
    <ros_topic_subscriber topic="/Battery/Level" type="sensor_msgs/BatteryState"/>
    <state id="idle">
        <ros_service_handle_request name="/GotoSkill/tick" target="sending"/>
        <ros_service_handle_request name="/GotoSkill/halt" target="idle">
            <ros_service_send_response name="/GotoSkill/halt"/>
        </ros_service_handle_request>
        <ros_topic_callback name="/Battery/Level" target="idle">
            <field name="percentage"/>
        </ros_topic_callback>
    </state>
    <state id="sending">
        <onentry>
            <ros_action_send_goal name="nav_goal">
                <field name="target" expr="'kitchen'"/>
            </ros_action_send_goal>
        </onentry>
        <ros_action_handle_goal_response name="nav_goal" accept="moving" reject="idle"/>
    </state>
    <state id="moving">
        <ros_action_handle_feedback name="nav_goal" target="moving">
            <assign location="distance" expr="_feedback.distance"/>
        </ros_action_handle_feedback>
        <ros_action_handle_success_result name="nav_goal" target="idle">
            <ros_service_send_response name="/GotoSkill/tick">
                <field name="status" expr="SUCCESS"/>
            </ros_service_send_response>
        </ros_action_handle_success_result>
    </state>
</scxml>
"#;

const GET_POSE_SRV: &str = "string frame_id\n---\nstring pose\nbool is_ok\n";
const GOTO_ACTION: &str = "string target\n---\nbool done\n---\nfloat32 distance\n";
const BATTERY_MSG: &str = "float32 percentage\nfloat32 voltage\n";

fn template_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates/skills/template_skill")
}

/// Lay out `<tmp>/<skill>/src/<Skill>.scxml` plus an interface tree
fn workspace(skill_dir: &str, file: &str, skill: &str) -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join(skill_dir).join("src");
    fs::create_dir_all(&src).unwrap();
    let input = src.join(file);
    fs::write(&input, skill).unwrap();

    let interfaces = tmp.path().join("interfaces");
    for (package, family, name, text) in [
        ("nav_interfaces", "srv", "GetPose.srv", GET_POSE_SRV),
        ("nav_interfaces", "action", "Goto.action", GOTO_ACTION),
        ("sensor_msgs", "msg", "BatteryState.msg", BATTERY_MSG),
    ] {
        let dir = interfaces.join(package).join(family);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), text).unwrap();
    }
    (tmp, input, interfaces)
}

fn read(dir: &Path, relative: &str) -> String {
    fs::read_to_string(dir.join(relative))
        .unwrap_or_else(|e| panic!("cannot read {relative}: {e}"))
}

fn assert_closed(text: &str, file: &str) {
    assert!(
        !LEFTOVER_MARKER.is_match(text),
        "{file} still has a marker: {:?}",
        LEFTOVER_MARKER.find(text).map(|m| m.as_str())
    );
    assert!(
        !LEFTOVER_PLACEHOLDER.is_match(text),
        "{file} still has a placeholder: {:?}",
        LEFTOVER_PLACEHOLDER.find(text).map(|m| m.as_str())
    );
}

#[test]
fn test_condition_skill_end_to_end() {
    let (tmp, input, interfaces) = workspace("nav_skill", "NavSkill.scxml", CONDITION_SKILL);

    let report = Pipeline::builder()
        .input(&input)
        .template_dir(template_dir())
        .interface_dir(&interfaces)
        .build()
        .unwrap()
        .run()
        .unwrap();

    let out = tmp.path().join("nav_skill");
    assert_eq!(report.state, PipelineState::Written);
    assert!(report.is_success(), "unclassified: {:?}", report.registration.unclassified);
    assert_eq!(report.canonical_path, Some(out.join("src/NavSkillSM.scxml")));
    assert_eq!(report.written.len(), 5);
    assert_eq!(report.total(), 6);

    // canonical statechart
    let canonical = Document::from_file(out.join("src/NavSkillSM.scxml")).unwrap();
    assert_eq!(canonical.attribute(canonical.root(), "name"), Some("NavSkillCondition"));
    let send = query::find_first_by_tag_and_attribute(
        &canonical,
        canonical.root(),
        "send",
        "event",
        "Nav.GetPose.Call",
    )
    .expect("service call send");
    let param = query::find_first_by_tag(&canonical, send, "param").expect("frame_id param");
    assert_eq!(canonical.attribute(param, "name"), Some("frame_id"));
    assert!(query::find_first_by_tag(&canonical, canonical.root(), "ros_service_client").is_none());

    // generated sources
    let header = read(&out, "include/NavSkill.h");
    assert!(header.contains("#include <nav_interfaces/srv/get_pose.hpp>"));
    assert!(header.contains("#include \"NavSkillSM.h\""));
    assert!(header.contains("NavSkillCondition m_stateMachine;"));
    assert!(header.contains("void tick("));
    assert!(!header.contains("void halt("));
    assert!(!header.contains("running"));

    let source = read(&out, "src/NavSkill.cpp");
    assert!(source.contains("connectToEvent(\"Nav.GetPose.Call\""));
    assert!(source.contains(
        "request->frame_id = convert<decltype(request->frame_id)>(eventParams[\"frame_id\"].toString().toStdString());"
    ));
    assert!(source.contains("data.insert(\"pose\", response->pose.c_str());"));
    assert!(source.contains("create_client<nav_interfaces::srv::GetPose>(\"/Nav/GetPose\")"));
    assert!(source.contains("submitEvent(\"Nav.GetPose.Return\", data);"));
    assert!(source.contains("\"TICK_RESPONSE\""));
    assert!(!source.contains("CMD_HALT"));

    let cmake = read(&out, "CMakeLists.txt");
    assert!(cmake.contains("project(nav_skill LANGUAGES CXX)"));
    assert_eq!(cmake.matches("find_package(nav_interfaces REQUIRED)").count(), 1);
    assert!(!cmake.contains("rclcpp_action"));
    assert!(!cmake.contains("DataModel"));

    let manifest = read(&out, "package.xml");
    assert!(manifest.contains("<name>nav_skill</name>"));
    assert_eq!(manifest.matches("<depend>nav_interfaces</depend>").count(), 1);

    let main = read(&out, "src/main.cpp");
    assert!(main.contains("#include \"NavSkill.h\""));

    for (file, text) in [
        ("header", &header),
        ("source", &source),
        ("cmake", &cmake),
        ("manifest", &manifest),
        ("main", &main),
    ] {
        assert_closed(text, file);
    }
    assert!(!out.join("include/NavSkillDataModel.h").exists());
}

#[test]
fn test_action_skill_with_data_model() {
    let (tmp, input, interfaces) = workspace("goto_skill", "GotoSkill.scxml", ACTION_SKILL);

    let report = Pipeline::builder()
        .input(&input)
        .template_dir(template_dir())
        .interface_dir(&interfaces)
        .data_model(true)
        .build()
        .unwrap()
        .run()
        .unwrap();

    let out = tmp.path().join("goto_skill");
    assert!(report.is_success(), "unclassified: {:?}", report.registration.unclassified);
    assert_eq!(report.written.len(), 7);
    assert_eq!(report.registration.reserved, 4);

    let canonical = Document::from_file(out.join("src/GotoSkillSM.scxml")).unwrap();
    assert_eq!(canonical.attribute(canonical.root(), "name"), Some("GotoSkillAction"));
    let goal_responses = query::collect_by_tag(&canonical, canonical.root(), "transition")
        .into_iter()
        .filter(|&t| canonical.attribute(t, "event") == Some("Nav.Goto.GoalResponse"))
        .count();
    assert_eq!(goal_responses, 2);

    let header = read(&out, "include/GotoSkill.h");
    assert!(header.contains("#include <rclcpp_action/rclcpp_action.hpp>"));
    assert!(header.contains("#include <nav_interfaces/action/goto.hpp>"));
    assert!(header.contains("#include <sensor_msgs/msg/battery_state.hpp>"));
    assert!(header.contains("#include \"GotoSkillDataModel.h\""));
    assert!(header.contains("GotoSkillDataModel m_dataModel;"));
    assert!(header.contains("void send_goal_goto(const QVariantMap & eventParams);"));
    assert!(header.contains("Feedback::_distance_type m_GotoFeedback_distance;  // float32"));
    assert!(header.contains("void topic_callback_Level("));
    assert!(header.contains("void halt("));
    assert!(header.contains("running,"));

    let source = read(&out, "src/GotoSkill.cpp");
    assert!(source.contains("connectToEvent(\"Nav.Goto.SendGoal\""));
    assert!(source.contains("goal.target = convert<decltype(goal.target)>(eventParams[\"target\"]"));
    assert!(source.contains("m_GotoFeedback_distance = feedback->distance;"));
    assert!(source.contains("data.insert(\"distance\", m_GotoFeedback_distance);"));
    assert!(source.contains("submitEvent(\"Nav.Goto.GoalResponse\", data);"));
    assert!(source.contains("submitEvent(\"Nav.Goto.ResultResponse\", data);"));
    assert!(source.contains("submitEvent(\"Nav.Goto.FeedbackReturn\", data);"));
    assert!(source.contains("create_subscription<sensor_msgs::msg::BatteryState>("));
    assert!(source.contains("\"/Battery/Level\", 10"));
    assert!(source.contains("data.insert(\"percentage\", msg->percentage);"));
    assert!(source.contains("m_stateMachine.setDataModel(&m_dataModel);"));
    assert_eq!(source.matches("void GotoSkill::send_goal_goto(").count(), 1);

    let cmake = read(&out, "CMakeLists.txt");
    assert!(cmake.contains("find_package(rclcpp_action REQUIRED)"));
    assert_eq!(cmake.matches("find_package(nav_interfaces REQUIRED)").count(), 1);
    assert_eq!(cmake.matches("find_package(sensor_msgs REQUIRED)").count(), 1);
    assert!(cmake.contains("src/GotoSkillDataModel.cpp"));

    let data_model = read(&out, "include/GotoSkillDataModel.h");
    assert!(data_model.contains("class GotoSkillDataModel : public QScxmlCppDataModel"));

    for relative in [
        "include/GotoSkill.h",
        "src/GotoSkill.cpp",
        "include/GotoSkillDataModel.h",
        "src/GotoSkillDataModel.cpp",
        "src/main.cpp",
        "CMakeLists.txt",
        "package.xml",
    ] {
        assert_closed(&read(&out, relative), relative);
    }
}

#[test]
fn test_translate_only_writes_canonical_statechart() {
    let (tmp, input, _) = workspace("nav_skill", "NavSkill.scxml", CONDITION_SKILL);
    let out = tmp.path().join("generated");

    let report = Pipeline::builder()
        .input(&input)
        .output_dir(&out)
        .template_dir(template_dir())
        .mode(PipelineMode::TranslateOnly)
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.state, PipelineState::Canonicalized);
    assert_eq!(report.total(), 1);
    assert!(out.join("src/NavSkillSM.scxml").is_file());
    assert!(!out.join("CMakeLists.txt").exists());
}

#[test]
fn test_generate_only_reads_canonical_input() {
    let (tmp, input, interfaces) = workspace("nav_skill", "NavSkill.scxml", CONDITION_SKILL);
    let translated = tmp.path().join("translated");
    Pipeline::builder()
        .input(&input)
        .output_dir(&translated)
        .mode(PipelineMode::TranslateOnly)
        .build()
        .unwrap()
        .run()
        .unwrap();

    let out = tmp.path().join("generated");
    let report = Pipeline::builder()
        .input(translated.join("src/NavSkillSM.scxml"))
        .output_dir(&out)
        .template_dir(template_dir())
        .interface_dir(&interfaces)
        .mode(PipelineMode::GenerateOnly)
        .build()
        .unwrap()
        .run()
        .unwrap();

    // canonical statecharts carry no declarations
    assert_eq!(report.state, PipelineState::Written);
    assert_eq!(report.canonical_path, None);
    assert!(!report.is_success());
    assert!(
        report
            .registration
            .unclassified
            .contains(&"Nav.GetPose.Call".to_string())
    );

    let source = read(&out, "src/NavSkill.cpp");
    assert!(!source.contains("Nav.GetPose.Call"));
    assert!(source.contains("CMD_TICK"));
}

#[test]
fn test_missing_template_directory() {
    let (tmp, input, _) = workspace("nav_skill", "NavSkill.scxml", CONDITION_SKILL);

    let mut pipeline = Pipeline::builder()
        .input(&input)
        .template_dir(tmp.path().join("no_templates"))
        .build()
        .unwrap();
    pipeline.canonicalize().unwrap();
    pipeline.classify().unwrap();
    let err = pipeline.synthesize().unwrap_err();

    assert!(err.to_string().contains("Template not found"));
    assert_eq!(pipeline.state(), PipelineState::Classified);
    // canonical statechart stays on disk
    assert!(tmp.path().join("nav_skill/src/NavSkillSM.scxml").is_file());
}
