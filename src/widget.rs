use gloo::events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlElement, KeyboardEvent, Node};

use crate::{
    error::{Error, Result},
    font::Font,
    stylesheet::ITEM_HEIGHT,
};

/// State shown by the dropdown icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Loading,
    Finished,
    Error,
}

impl Status {
    pub fn class_name(self) -> &'static str {
        match self {
            Status::Loading => "loading",
            Status::Finished => "finished",
            Status::Error => "error",
        }
    }
}

/// Enter and Space activate a `role=button` element like a click.
pub fn is_activation_key(key: &str) -> bool {
    matches!(key, "Enter" | " " | "Spacebar")
}

/// The picker's DOM nodes.
///
/// ```text
/// div#font-picker{suffix}
///   div.dropdown-button[role=button]
///     p.dropdown-font-family
///     p.dropdown-icon.{loading|finished|error}
///   ul.font-list[.expanded]
///     li > button.font-button.font-{id}{suffix}
/// ```
pub struct View {
    document: Document,
    suffix: String,
    root: HtmlElement,
    button: Element,
    label: Element,
    icon: Element,
    list: HtmlElement,
    /// Listeners of the current list entries, dropped on re-render.
    entries: Vec<EventListener>,
}

impl View {
    pub fn build(document: &Document, suffix: &str) -> Result<Self> {
        let root = create(document, "div")?.dyn_into::<HtmlElement>().map_err(|e| Error::js(e.into()))?;
        root.set_id(&format!("font-picker{suffix}"));

        let button = create(document, "div")?;
        button.set_class_name("dropdown-button");
        set_attr(&button, "role", "button")?;
        set_attr(&button, "tabindex", "0")?;

        let label = create(document, "p")?;
        label.set_class_name("dropdown-font-family");
        let icon = create(document, "p")?;
        icon.set_class_name(&format!("dropdown-icon {}", Status::Loading.class_name()));
        append(&button, &label)?;
        append(&button, &icon)?;

        let list = create(document, "ul")?.dyn_into::<HtmlElement>().map_err(|e| Error::js(e.into()))?;
        list.set_class_name("font-list");

        append(&root, &button)?;
        append(&root, &list)?;

        Ok(Self {
            document: document.clone(),
            suffix: suffix.to_owned(),
            root,
            button,
            label,
            icon,
            list,
            entries: Vec::new(),
        })
    }

    pub fn root(&self) -> &HtmlElement {
        &self.root
    }

    pub fn button(&self) -> &Element {
        &self.button
    }

    pub fn list(&self) -> &HtmlElement {
        &self.list
    }

    /// Whether `event` originated inside the picker.
    pub fn contains_target(&self, event: &Event) -> bool {
        event
            .target()
            .and_then(|t| t.dyn_into::<Node>().ok())
            .is_some_and(|node| self.root.contains(Some(&node)))
    }

    pub fn set_label(&self, family: &str) {
        self.label.set_text_content(Some(family));
    }

    pub fn set_status(&self, status: Status) {
        self.icon
            .set_class_name(&format!("dropdown-icon {}", status.class_name()));
    }

    pub fn set_expanded(&self, expanded: bool) -> Result<()> {
        let classes = self.list.class_list();
        let result = if expanded {
            classes.add_1("expanded")
        } else {
            classes.remove_1("expanded")
        };
        result.map_err(Error::js)?;
        set_attr(&self.button, "aria-expanded", if expanded { "true" } else { "false" })
    }

    /// Rebuilds the list. `on_select` wires each entry to its family.
    pub fn render_list<F>(&mut self, fonts: &[Font], active: &str, mut on_select: F) -> Result<()>
    where
        F: FnMut(&Element, &Font) -> Vec<EventListener>,
    {
        self.entries.clear();
        self.list.set_inner_html("");

        for font in fonts {
            let item = create(&self.document, "li")?;
            let entry = create(&self.document, "button")?;
            entry.set_class_name(&format!("font-button font-{}{}", font.id, self.suffix));
            if font.family == active {
                entry.class_list().add_1("active-font").map_err(Error::js)?;
            }
            set_attr(&entry, "type", "button")?;
            entry.set_text_content(Some(&font.family));
            append(&item, &entry)?;
            append(&self.list, &item)?;
            self.entries.extend(on_select(&entry, font));
        }
        Ok(())
    }

    /// Moves the `active-font` marker to `font_id`.
    pub fn mark_active(&self, font_id: &str) -> Result<()> {
        let entries = self.list.get_elements_by_class_name("font-button");
        let wanted = format!("font-{font_id}{}", self.suffix);
        for i in 0..entries.length() {
            let Some(entry) = entries.item(i) else {
                continue;
            };
            let classes = entry.class_list();
            if classes.contains(&wanted) {
                classes.add_1("active-font").map_err(Error::js)?;
            } else {
                classes.remove_1("active-font").map_err(Error::js)?;
            }
        }
        Ok(())
    }

    /// Scroll geometry of the list as `(scroll_top, viewport_height, item_height)`.
    pub fn scroll_geometry(&self) -> (f64, f64, f64) {
        let item_height = self
            .list
            .first_element_child()
            .map(|item| item.get_bounding_client_rect().height())
            .filter(|h| *h > 0.0)
            .unwrap_or(ITEM_HEIGHT);
        (
            self.list.scroll_top() as f64,
            self.list.client_height() as f64,
            item_height,
        )
    }

    /// Brings the entry at `index` into view.
    pub fn scroll_to(&self, index: usize) {
        let (_, _, item_height) = self.scroll_geometry();
        self.list.set_scroll_top((index as f64 * item_height) as i32);
    }
}

/// Listens for clicks and activation keys on `target`.
pub fn on_activate<F>(target: &Element, callback: F) -> Vec<EventListener>
where
    F: Fn(&Event) + Clone + 'static,
{
    let on_click = callback.clone();
    vec![
        EventListener::new(target, "click", move |event| on_click(event)),
        EventListener::new(target, "keypress", move |event| {
            let activated = event
                .dyn_ref::<KeyboardEvent>()
                .is_some_and(|key| is_activation_key(&key.key()));
            if activated {
                event.prevent_default();
                callback(event);
            }
        }),
    ]
}

fn create(document: &Document, tag: &str) -> Result<Element> {
    document.create_element(tag).map_err(Error::js)
}

fn append(parent: &Node, child: &Node) -> Result<()> {
    parent.append_child(child).map(|_| ()).map_err(Error::js)
}

fn set_attr(element: &Element, name: &str, value: &str) -> Result<()> {
    element.set_attribute(name, value).map_err(Error::js)
}
