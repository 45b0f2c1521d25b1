use crate::consent::ConsentAction;

/// Name of the function the in-page engine calls when it finds a consent dialog
pub const BRIDGE_NAME: &str = "__consentDetected";

const ENGINE_TEMPLATE: &str = r#"(() => {
    const action = "__ACTION__";
    let consentTypes = GDPRConfig.defaultValues;
    const debugValues = GDPRConfig.defaultDebugFlags;
    if (action === "NO_ACTION") {
        debugValues.skipActions = true;
    } else if (action === "ACCEPT_ALL") {
        consentTypes = { A: true, B: true, D: true, E: true, F: true, X: true };
    } else if (action === "REJECT_ALL") {
        consentTypes = { A: false, B: false, D: false, E: false, F: false, X: false };
    }
    new ConsentEngine(cmpConfigData, consentTypes, debugValues, async stats => {
        await window.__BRIDGE__(JSON.stringify(stats));
    });
})();"#;

/// Builds the script that starts the consent detection engine in the page
///
/// The engine itself (`ConsentEngine`, `GDPRConfig`, `cmpConfigData`) is provided by the
/// browser driver's page setup; this script only configures and starts it, wiring its
/// detection callback to [`BRIDGE_NAME`].
pub fn engine_script(action: ConsentAction) -> String {
    ENGINE_TEMPLATE
        .replace("__ACTION__", action.as_str())
        .replace("__BRIDGE__", BRIDGE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_carries_action_and_bridge() {
        let script = engine_script(ConsentAction::RejectAll);
        assert!(script.contains(r#"const action = "REJECT_ALL";"#));
        assert!(script.contains("window.__consentDetected("));
        assert!(!script.contains("__ACTION__"));
        assert!(!script.contains("__BRIDGE__"));
    }

    #[test]
    fn test_no_action_skips_actions() {
        let script = engine_script(ConsentAction::NoAction);
        assert!(script.contains(r#""NO_ACTION""#));
        assert!(script.contains("debugValues.skipActions = true"));
    }
}
