/// Options page: the pinned-tab preference

use yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use patternfly_yew::prelude::*;
use crate::extension::{load_preferences, save_preferences};
use crate::storage::Preferences;

#[function_component(OptionsPage)]
pub fn options_page() -> Html {
    let preferences = use_state(|| None::<Preferences>);
    let error = use_state(|| None::<String>);

    // Load stored preferences on mount
    {
        let preferences = preferences.clone();
        let error = error.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                match load_preferences().await {
                    Ok(loaded) => preferences.set(Some(loaded)),
                    Err(e) => error.set(Some(format!("Failed to load preferences: {}", e))),
                }
            });
            || ()
        });
    }

    // Save on every toggle
    let on_toggle = {
        let preferences = preferences.clone();
        let error = error.clone();

        Callback::from(move |e: Event| {
            let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                return;
            };
            let updated = Preferences {
                keep_pinned: input.checked(),
            };
            preferences.set(Some(updated.clone()));

            let error = error.clone();
            spawn_local(async move {
                if let Err(e) = save_preferences(&updated).await {
                    error.set(Some(format!("Failed to save: {}", e)));
                }
            });
        })
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Tab Grouper"}</h1>

            if let Some(message) = (*error).clone() {
                <Alert r#type={AlertType::Danger} title={message} inline={true}>
                </Alert>
            }

            {match &*preferences {
                None => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                Some(prefs) => html! {
                    <label class="pf-v5-c-switch">
                        <input
                            class="pf-v5-c-switch__input"
                            type="checkbox"
                            checked={prefs.keep_pinned}
                            onchange={on_toggle.clone()}
                        />
                        <span class="pf-v5-c-switch__toggle"></span>
                        <span class="pf-v5-c-switch__label">{"Keep pinned tabs in place when sorting"}</span>
                    </label>
                },
            }}

            <p class="footer-popup">
                {"Tab Grouper v0.1.0"}
            </p>
        </div>
    }
}
