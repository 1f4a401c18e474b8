//! Worker UI templates
//!
//! Both templates are static crowd-HTML forms rendered by the labeling-job
//! service; only the bounding-box form takes text overrides.

use crate::config::TemplateConfig;

const DEFAULT_HEADER: &str = "Please adjust existing bounding box around instances of humans and assign the correct label. See full instructions for additional information.";

const DEFAULT_FULL_INSTRUCTIONS: &str = r#"
        <full-instructions header="Bounding box adjustment instructions">
            <p>Note: For this task, if there are more than 4 people in the image, you only need to label the closest/biggest 4 people. </p><p><br></p><ol><li><strong>Inspect</strong> the image</li><li><strong>Determine</strong> if the specified label is/are visible in the picture.</li><li><strong>Outline</strong> each instance of the specified label in the image using the provided “Box” tool.</li></ol><ul><li>Boxes should fit tight around each object</li><li>Do not include parts of the object are overlapping or that cannot be seen, even though you think you can interpolate the whole shape.</li><li>Avoid including shadows.</li><li>If the target is off screen, draw the box up to the edge of the image.</li></ul><p><img src="https://d1i6hezpxab4vs.cloudfront.net/76082909-991b-406e-83a3-92726c2b00c5/src/images/bounding-box-good-example.png" style="max-width:100%"></p><h2><span style="color: rgb(0, 138, 0);">Good Example</span></h2><p><img src="https://d1i6hezpxab4vs.cloudfront.net/76082909-991b-406e-83a3-92726c2b00c5/src/images/bounding-box-bad-example.png" style="max-width:100%"></p><h2><span style="color: rgb(230, 0, 0);">Bad Example</span></h2>
        </full-instructions>"#;

const DEFAULT_SHORT_INSTRUCTIONS: &str = r#"
        <short-instructions>
            <h2><span style="color: rgb(0, 138, 0);">Good example</span></h2><p>Enter description of a correct bounding box label</p><p><img src="https://d1i6hezpxab4vs.cloudfront.net/76082909-991b-406e-83a3-92726c2b00c5/src/images/quick-instructions-example-placeholder.png" style="max-width:100%"></p><p><br></p><h2><span style="color: rgb(230, 0, 0);">Bad example</span></h2><p>Enter description of an incorrect bounding box label</p><p><img src="https://d1i6hezpxab4vs.cloudfront.net/76082909-991b-406e-83a3-92726c2b00c5/src/images/quick-instructions-example-placeholder.png" style="max-width:100%"></p>
        </short-instructions>"#;

const BOUNDING_BOX_FORM: &str = r#"
    <script src="https://assets.crowd.aws/crowd-html-elements.js"></script>
    <crowd-form>
      <crowd-bounding-box
        name="boundingBox"
        src="{{ task.input.taskObject | grant_read_access }}"
        header="@HEADER@"
        labels="{{ task.input.labels | to_json | escape }}"
        initial-value="[
          {% for box in task.input.manifestLine.bounding-box.annotations %}
            {% capture class_id %}{{ box.class_id }}{% endcapture %}
            {% assign label = task.input.manifestLine.bounding-box-metadata.class-map[class_id] %}
          {
            label: {{label | to_json}},
            left: {{box.left}},
            top: {{box.top}},
            width: {{box.width}},
            height: {{box.height}},
          },
          {% endfor %}
        ]"
      >
        @FULL_INSTRUCTIONS@@SHORT_INSTRUCTIONS@
      </crowd-bounding-box>
    </crowd-form>"#;

const LABEL_VERIFICATION_FORM: &str = r#"
    <script src="https://assets.crowd.aws/crowd-html-elements.js"></script>
    <style>
    .center {    text-align: center;
    border: 3px solid white;
    }
    .row {    display: flex;
    flex-wrap: wrap;
    padding: 0 4px;
    }
    .column {    flex: 18%;
    padding: 0 4px;
    }
    </style>
    <crowd-form>
    <div class="center">
    <h1> Confirm that each image is correctly labelled as "{{ task.input.sourceRef[0].label }}"</h1>
    </div>
    <div class="row">
    {% assign length = task.input.sourceRef.size | minus: 1 %}
    {% for i in (0..length) %}
    <div class="column">
    <crowd-card
    image="{{ task.input.sourceRef[i].imageUrl | grant_read_access }}">
    <div class="center">Confirm <crowd-checkbox checked="true" name="item-{{i}}" value="Confirmed" /></div>
    </crowd-card>
    </div>
    {% endfor %}
    </div>
    </crowd-form>"#;

/// Bounding-box adjustment form, with configured text where set
pub fn bounding_box_template(config: &TemplateConfig) -> String {
    let header = config.header.as_deref().unwrap_or(DEFAULT_HEADER);
    let full = config
        .full_instructions
        .as_deref()
        .unwrap_or(DEFAULT_FULL_INSTRUCTIONS);
    let short = config
        .short_instructions
        .as_deref()
        .unwrap_or(DEFAULT_SHORT_INSTRUCTIONS);

    BOUNDING_BOX_FORM
        .replace("@HEADER@", &escape_attribute(header))
        .replace("@FULL_INSTRUCTIONS@", full)
        .replace("@SHORT_INSTRUCTIONS@", short)
}

/// Label-verification card grid; one `item-<i>` checkbox per shard entry
pub fn label_verification_template() -> String {
    LABEL_VERIFICATION_FORM.to_string()
}

fn escape_attribute(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounding_box_template() {
        let html = bounding_box_template(&TemplateConfig::default());
        assert!(html.contains(DEFAULT_HEADER));
        assert!(html.contains("<full-instructions"));
        assert!(html.contains("<short-instructions>"));
        assert!(html.contains("{{ task.input.labels | to_json | escape }}"));
        assert!(!html.contains('@'));
    }

    #[test]
    fn test_bounding_box_template_overrides() {
        let config = TemplateConfig {
            header: Some("Adjust the \"dog\" boxes".to_string()),
            full_instructions: Some("<full-instructions header=\"x\">Be precise</full-instructions>".to_string()),
            short_instructions: None,
        };
        let html = bounding_box_template(&config);
        assert!(html.contains("header=\"Adjust the &quot;dog&quot; boxes\""));
        assert!(html.contains("Be precise"));
        assert!(html.contains("<short-instructions>"));
    }

    #[test]
    fn test_label_verification_template_checkbox() {
        let html = label_verification_template();
        assert!(html.contains(r#"name="item-{{i}}" value="Confirmed""#));
    }
}
