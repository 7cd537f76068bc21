//! Browser front end: builds the page, draws the wheel on a canvas and routes
//! DOM events and scheduler ticks into [`RouletteApp`].

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::ThreadRng;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlButtonElement, HtmlCanvasElement, HtmlElement,
    HtmlInputElement, window,
};

use crate::app::{Action, RouletteApp};
use crate::config::{RouletteConfig, SpinDuration};
use crate::error::RouletteError;
use crate::menu::PageStore;
use crate::scheduler::{FrameScheduler, TickToken};
use crate::sector;

/// Sector fill colors, cycled by index.
pub const WHEEL_COLORS: [&str; 8] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40", "#7CFC00", "#FF6347",
];

const MOBILE_BREAKPOINT: f64 = 768.0;

const ID_SPIN: &str = "lr-spin";
const ID_INPUT: &str = "lr-input";
const ID_ADD: &str = "lr-add";
const ID_DURATION: &str = "lr-duration";
const ID_DURATION_LABEL: &str = "lr-duration-label";
const ID_POPUP: &str = "lr-popup";
const ID_POPUP_CARD: &str = "lr-popup-card";
const ID_POPUP_OK: &str = "lr-popup-ok";
const ID_RESULT: &str = "lr-result";

struct WebState {
    app: RouletteApp<PageStore>,
    sched: FrameScheduler,
    rng: ThreadRng,
    doc: Document,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

thread_local! {
    static ROULETTE: RefCell<Option<WebState>> = const { RefCell::new(None) };
}

fn with_state(f: impl FnOnce(&mut WebState)) {
    ROULETTE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            f(state);
        }
    });
}

fn dispatch_tick(token: TickToken, ts: f64) {
    with_state(|st| {
        let action = st.app.on_tick(token, ts, &mut st.rng, &mut st.sched);
        handle_action(st, action);
    });
}

pub fn start_roulette_mode(config: RouletteConfig) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // A second start replaces the running instance.
    stop_roulette_mode();

    let store = PageStore::open();
    let app = RouletteApp::new(config, store);
    let canvas = build_page(&doc, app.config(), app.spin_duration())?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let state = WebState {
        app,
        sched: FrameScheduler::new(Rc::new(dispatch_tick)),
        rng: rand::rng(),
        doc: doc.clone(),
        canvas: canvas.clone(),
        ctx,
    };
    ROULETTE.with(|cell| cell.replace(Some(state)));

    wire_events(&doc, &canvas)?;
    with_state(|st| render(st));
    log::info!("lunch roulette started");
    Ok(())
}

/// Cancel pending animation callbacks and drop the running instance.
pub fn stop_roulette_mode() {
    let previous = ROULETTE.with(|cell| cell.borrow_mut().take());
    if let Some(mut st) = previous {
        st.app.teardown(&mut st.sched);
        log::info!("lunch roulette stopped");
    }
}

// --- Page construction ------------------------------------------------------

fn create(doc: &Document, tag: &str, style: &str) -> Result<Element, JsValue> {
    let el = doc.create_element(tag)?;
    if !style.is_empty() {
        el.set_attribute("style", style)?;
    }
    Ok(el)
}

fn build_page(doc: &Document, config: &RouletteConfig, duration: SpinDuration) -> Result<HtmlCanvasElement, JsValue> {
    let body = doc.body().ok_or_else(|| JsValue::from_str("no body"))?;

    if let Some(existing) = doc.get_element_by_id("lr-root") {
        existing.remove();
    }
    let root = create(doc, "div", "display:flex; flex-direction:column; align-items:center; max-width:28rem; margin:0 auto; padding:8px; font-family:sans-serif;")?;
    root.set_id("lr-root");

    let title = create(doc, "h1", "font-size:1.4rem; font-weight:bold; text-align:center;")?;
    title.set_text_content(Some("오늘의 점심 메뉴는?"));
    root.append_child(&title)?;

    let canvas: HtmlCanvasElement = create(doc, "canvas", "touch-action:none; user-select:none; cursor:pointer;")?.dyn_into()?;
    canvas.set_id(&config.canvas_id);
    canvas.set_width(config.canvas_size);
    canvas.set_height(config.canvas_size);
    root.append_child(&canvas)?;

    let spin = create(doc, "button", "margin:12px 0; padding:12px 24px; border-radius:8px; color:white; font-weight:bold; font-size:1.1rem; border:none;")?;
    spin.set_id(ID_SPIN);
    root.append_child(&spin)?;

    let add_title = create(doc, "h2", "font-size:1.1rem; font-weight:bold; align-self:flex-start;")?;
    add_title.set_text_content(Some("메뉴 추가"));
    root.append_child(&add_title)?;
    let row = create(doc, "div", "display:flex; width:100%;")?;
    let input: HtmlInputElement = create(doc, "input", "flex:1; padding:12px; border:1px solid #ccc; border-radius:8px 0 0 8px; font-size:16px;")?.dyn_into()?;
    input.set_id(ID_INPUT);
    input.set_type("text");
    input.set_placeholder("새 메뉴 입력");
    row.append_child(&input)?;
    let add = create(doc, "button", "background:#22c55e; color:white; padding:12px 16px; border:none; border-radius:0 8px 8px 0;")?;
    add.set_id(ID_ADD);
    add.set_text_content(Some("추가"));
    row.append_child(&add)?;
    root.append_child(&row)?;

    let dur_title = create(doc, "h2", "font-size:1.1rem; font-weight:bold; align-self:flex-start;")?;
    dur_title.set_text_content(Some("회전 시간 설정 (초)"));
    root.append_child(&dur_title)?;
    let dur_row = create(doc, "div", "display:flex; align-items:center; width:100%;")?;
    let dur_label = create(doc, "span", "margin-right:8px;")?;
    dur_label.set_id(ID_DURATION_LABEL);
    dur_row.append_child(&dur_label)?;
    let range: HtmlInputElement = create(doc, "input", "flex:1;")?.dyn_into()?;
    range.set_id(ID_DURATION);
    range.set_type("range");
    range.set_min(&SpinDuration::MIN.to_string());
    range.set_max(&SpinDuration::MAX.to_string());
    range.set_value(&duration.secs().to_string());
    dur_row.append_child(&range)?;
    root.append_child(&dur_row)?;

    let hint = create(doc, "p", "margin-top:12px; font-size:0.85rem; color:#555; text-align:center;")?;
    hint.set_text_content(Some("원하지 않는 메뉴는 파이를 터치하여 제거할 수 있습니다."));
    root.append_child(&hint)?;

    let popup = create(doc, "div", "display:none; position:fixed; inset:0; align-items:center; justify-content:center; background:rgba(0,0,0,0.4); z-index:50;")?;
    popup.set_id(ID_POPUP);
    let card = create(doc, "div", "background:white; border-radius:8px; padding:20px; width:80%; max-width:20rem; text-align:center;")?;
    card.set_id(ID_POPUP_CARD);
    let card_title = create(doc, "div", "font-weight:bold; margin-bottom:8px;")?;
    card_title.set_text_content(Some("오늘의 점심 메뉴"));
    card.append_child(&card_title)?;
    let result = create(doc, "div", "font-size:1.9rem; font-weight:800; padding:16px; background:#fef9c3; border-radius:8px; margin-bottom:12px;")?;
    result.set_id(ID_RESULT);
    card.append_child(&result)?;
    let enjoy = create(doc, "p", "color:#555; margin-bottom:12px;")?;
    enjoy.set_text_content(Some("맛있게 드세요!"));
    card.append_child(&enjoy)?;
    let ok = create(doc, "button", "background:#3b82f6; color:white; padding:8px 16px; border:none; border-radius:8px; width:100%; font-weight:bold;")?;
    ok.set_id(ID_POPUP_OK);
    ok.set_text_content(Some("확인"));
    card.append_child(&ok)?;
    popup.append_child(&card)?;
    root.append_child(&popup)?;

    body.append_child(&root)?;
    Ok(canvas)
}

// --- Events -----------------------------------------------------------------

fn listen<T, F>(target: &T, event: &str, handler: F) -> Result<(), JsValue>
where
    T: AsRef<web_sys::EventTarget>,
    F: FnMut(web_sys::Event) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(_)>);
    target
        .as_ref()
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn by_id(doc: &Document, id: &str) -> Result<Element, JsValue> {
    doc.get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))
}

fn submit_input(st: &mut WebState) {
    let Some(input) = st
        .doc
        .get_element_by_id(ID_INPUT)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    else {
        return;
    };
    let action = st.app.add_menu(&input.value());
    if action == Action::MenuChanged {
        input.set_value("");
        if is_narrow() {
            let _ = input.blur();
        }
    }
    handle_action(st, action);
}

fn wire_events(doc: &Document, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    listen(&by_id(doc, ID_SPIN)?, "click", |_| {
        with_state(|st| {
            let action = st.app.spin(&mut st.rng, &mut st.sched);
            handle_action(st, action);
        });
    })?;

    listen(&by_id(doc, ID_ADD)?, "click", |_| with_state(submit_input))?;

    listen(&by_id(doc, ID_INPUT)?, "keydown", |evt| {
        let is_enter = evt
            .dyn_ref::<web_sys::KeyboardEvent>()
            .map(|k| k.key() == "Enter")
            .unwrap_or(false);
        if is_enter {
            with_state(submit_input);
        }
    })?;

    listen(&by_id(doc, ID_DURATION)?, "input", |evt| {
        let Some(range) = evt
            .target()
            .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        let secs = range.value().parse::<u32>().unwrap_or(SpinDuration::default().secs() as u32);
        with_state(|st| {
            let action = st.app.set_spin_duration(secs);
            handle_action(st, action);
        });
    })?;

    let canvas_click = canvas.clone();
    listen(canvas, "click", move |evt| {
        let Some(mouse) = evt.dyn_ref::<web_sys::MouseEvent>() else {
            return;
        };
        let size = canvas_click.width() as f64;
        let center = size / 2.0;
        let (x, y) = (mouse.offset_x() as f64, mouse.offset_y() as f64);
        // Only clicks on the wheel face count.
        if (x - center).hypot(y - center) > wheel_radius(size) {
            return;
        }
        let angle = sector::angle_of_point(center, center, x, y);
        with_state(|st| {
            let action = st.app.click_wheel(angle);
            handle_action(st, action);
        });
    })?;

    listen(&by_id(doc, ID_POPUP)?, "click", |_| {
        with_state(|st| {
            let action = st.app.dismiss_popup();
            handle_action(st, action);
        });
    })?;
    listen(&by_id(doc, ID_POPUP_CARD)?, "click", |evt| evt.stop_propagation())?;
    listen(&by_id(doc, ID_POPUP_OK)?, "click", |_| {
        with_state(|st| {
            let action = st.app.dismiss_popup();
            handle_action(st, action);
        });
    })?;
    Ok(())
}

fn handle_action(st: &mut WebState, action: Action) {
    match action {
        Action::None => {}
        Action::Warn(msg) => {
            if let Some(w) = window() {
                let _ = w.alert_with_message(&msg);
            }
        }
        Action::RenderNeeded | Action::MenuChanged | Action::Selected(_) | Action::ShowResult(_) => render(st),
    }
}

// --- Rendering --------------------------------------------------------------

fn is_narrow() -> bool {
    window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64())
        .map(|w| w < MOBILE_BREAKPOINT)
        .unwrap_or(true)
}

fn wheel_radius(size: f64) -> f64 {
    size / 2.0 * 0.85
}

fn render(st: &WebState) {
    if let Err(e) = draw_canvas(st) {
        log::warn!("render failed: {}", RouletteError::from(e));
    }
    update_controls(st);
}

fn draw_canvas(st: &WebState) -> Result<(), JsValue> {
    let ctx = &st.ctx;
    let size = st.canvas.width() as f64;
    let c = size / 2.0;
    let radius = wheel_radius(size);
    let items = st.app.menus().items();
    let count = items.len();
    let narrow = is_narrow();

    ctx.clear_rect(0.0, 0.0, size, st.canvas.height() as f64);

    ctx.save();
    ctx.translate(c, c)?;
    ctx.rotate(st.app.rotation().to_radians())?;
    ctx.translate(-c, -c)?;
    for s in sector::sectors(count) {
        ctx.begin_path();
        ctx.move_to(c, c);
        ctx.arc(c, c, radius, sector::to_screen_radians(s.start_angle), sector::to_screen_radians(s.end_angle))?;
        ctx.close_path();
        ctx.set_fill_style(&JsValue::from_str(WHEEL_COLORS[s.index % WHEEL_COLORS.len()]));
        ctx.fill();
    }

    let font_px = if narrow { if size < 360.0 { 10 } else { 12 } } else { 14 };
    ctx.set_font(&format!("bold {font_px}px sans-serif"));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style(&JsValue::from_str("#fff"));
    for s in sector::sectors(count) {
        let label = if narrow { sector::truncate_label(&items[s.index], count) } else { items[s.index].clone() };
        let (tx, ty) = sector::point_on_circle(c, c, radius * 0.6, s.mid_angle());
        ctx.save();
        ctx.translate(tx, ty)?;
        ctx.rotate(sector::to_screen_radians(s.mid_angle()))?;
        ctx.fill_text(&label, 0.0, 0.0)?;
        ctx.restore();
    }

    ctx.begin_path();
    ctx.arc(c, c, radius * 0.07, 0.0, std::f64::consts::TAU)?;
    ctx.set_fill_style(&JsValue::from_str("#333"));
    ctx.fill();
    ctx.restore();

    // Fixed pointer at 12 o'clock.
    let top = c - radius;
    ctx.begin_path();
    ctx.move_to(c, top + 8.0);
    ctx.line_to(c - 10.0, top - 8.0);
    ctx.line_to(c + 10.0, top - 8.0);
    ctx.close_path();
    ctx.set_fill_style(&JsValue::from_str("red"));
    ctx.fill();

    let particles = st.app.confetti().particles();
    if !particles.is_empty() {
        ctx.save();
        ctx.set_global_alpha(0.8);
        for p in particles {
            let px = p.x / 100.0 * size;
            let py = p.y / 100.0 * size;
            ctx.save();
            ctx.translate(px, py)?;
            ctx.rotate(p.rotation.to_radians())?;
            ctx.begin_path();
            ctx.arc(0.0, 0.0, p.size / 2.0, 0.0, std::f64::consts::TAU)?;
            ctx.set_fill_style(&JsValue::from_str(p.color));
            ctx.fill();
            ctx.restore();
        }
        ctx.restore();
    }
    Ok(())
}

fn update_controls(st: &WebState) {
    let doc = &st.doc;
    if let Some(btn) = doc
        .get_element_by_id(ID_SPIN)
        .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok())
    {
        let enabled = st.app.can_spin();
        btn.set_disabled(!enabled);
        btn.set_text_content(Some(if st.app.is_spinning() { "돌아가는 중..." } else { "룰렛 돌리기" }));
        let bg = if enabled { "#3b82f6" } else { "#9ca3af" };
        let _ = btn.style().set_property("background", bg);
    }
    let secs = st.app.spin_duration().secs();
    if let Some(label) = doc.get_element_by_id(ID_DURATION_LABEL) {
        label.set_text_content(Some(&format!("{secs}초")));
    }
    if let Some(range) = doc
        .get_element_by_id(ID_DURATION)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    {
        range.set_value(&secs.to_string());
    }
    if let Some(popup) = doc
        .get_element_by_id(ID_POPUP)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    {
        let visible = st.app.popup_visible();
        let _ = popup.style().set_property("display", if visible { "flex" } else { "none" });
        if let Some(result) = doc.get_element_by_id(ID_RESULT) {
            result.set_text_content(st.app.selected());
        }
    }
}
