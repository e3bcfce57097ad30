use mimalloc::MiMalloc;
use neon::{prelude::*, types::buffer::TypedArray};
use once_cell::sync::{Lazy, OnceCell};
use proxy_overlay::{
    Frame, OverlayConfig, OverlayRegistry, PlatformBackend,
    backend::{self, FrameRect},
    event::WindowId,
    util,
};
use tracing::{debug, level_filters::LevelFilter, warn};
use tracing_subscriber::{Registry, layer::SubscriberExt, reload, util::SubscriberInitExt};

static OVERLAYS: Lazy<OverlayRegistry<PlatformBackend>> = Lazy::new(OverlayRegistry::new);

static LOG_FILTER: OnceCell<reload::Handle<LevelFilter, Registry>> = OnceCell::new();

fn setup_tracing() -> &'static reload::Handle<LevelFilter, Registry> {
    LOG_FILTER.get_or_init(|| {
        let (filter, handle) = reload::Layer::new(LevelFilter::WARN);

        let res = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .try_init();
        if let Err(err) = res {
            eprintln!("proxy-overlay: tracing already initialized. err: {err}");
        }

        handle
    })
}

fn create_overlay(mut cx: FunctionContext) -> JsResult<JsNumber> {
    let width = cx.argument::<JsNumber>(0)?.value(&mut cx) as u32;
    let height = cx.argument::<JsNumber>(1)?.value(&mut cx) as u32;
    let title = cx.argument::<JsString>(2)?.value(&mut cx);

    let config = OverlayConfig::new(width, height, title).with_env();
    match OVERLAYS.create(&config, PlatformBackend::create) {
        Ok(id) => {
            debug!("overlay {id} created: {width}x{height}");
            Ok(cx.number(id))
        }
        Err(err) => cx.throw_error(err.to_string()),
    }
}

fn show(mut cx: FunctionContext) -> JsResult<JsUndefined> {
    let id = cx.argument::<JsNumber>(0)?.value(&mut cx) as u32;

    OVERLAYS.show(id);
    Ok(cx.undefined())
}

fn hide(mut cx: FunctionContext) -> JsResult<JsUndefined> {
    let id = cx.argument::<JsNumber>(0)?.value(&mut cx) as u32;

    OVERLAYS.hide(id);
    Ok(cx.undefined())
}

fn set_frame(mut cx: FunctionContext) -> JsResult<JsUndefined> {
    let id = cx.argument::<JsNumber>(0)?.value(&mut cx) as u32;
    let x = cx.argument::<JsNumber>(1)?.value(&mut cx) as i32;
    let y = cx.argument::<JsNumber>(2)?.value(&mut cx) as i32;
    let width = cx.argument::<JsNumber>(3)?.value(&mut cx) as u32;
    let height = cx.argument::<JsNumber>(4)?.value(&mut cx) as u32;

    OVERLAYS.set_frame(id, FrameRect::new(x, y, width, height));
    Ok(cx.undefined())
}

fn render_frame(mut cx: FunctionContext) -> JsResult<JsUndefined> {
    let id = cx.argument::<JsNumber>(0)?.value(&mut cx) as u32;
    let buffer = cx.argument::<JsBuffer>(1)?;
    let width = cx.argument::<JsNumber>(2)?.value(&mut cx) as u32;
    let height = cx.argument::<JsNumber>(3)?.value(&mut cx) as u32;

    OVERLAYS.render_frame(id, Frame::new(buffer.as_slice(&cx), width, height));
    Ok(cx.undefined())
}

fn set_routing_target(mut cx: FunctionContext) -> JsResult<JsUndefined> {
    let id = cx.argument::<JsNumber>(0)?.value(&mut cx) as u32;
    let window = cx.argument::<JsNumber>(1)?.value(&mut cx) as u64;

    OVERLAYS.set_routing_target(id, window);
    Ok(cx.undefined())
}

fn destroy_overlay(mut cx: FunctionContext) -> JsResult<JsUndefined> {
    let id = cx.argument::<JsNumber>(0)?.value(&mut cx) as u32;

    OVERLAYS.destroy(id);
    Ok(cx.undefined())
}

fn set_debug_logging(mut cx: FunctionContext) -> JsResult<JsUndefined> {
    let enabled = cx.argument::<JsBoolean>(0)?.value(&mut cx);

    let level = if enabled {
        LevelFilter::TRACE
    } else {
        LevelFilter::WARN
    };
    if let Err(err) = setup_tracing().modify(|filter| *filter = level) {
        eprintln!("proxy-overlay: cannot change log level. err: {err}");
    }

    Ok(cx.undefined())
}

fn tag_window(mut cx: FunctionContext) -> JsResult<JsBoolean> {
    let window = cx.argument::<JsNumber>(0)?.value(&mut cx) as u64;
    let app_id = cx.argument::<JsNumber>(1)?.value(&mut cx) as u32;

    let Some(window) = WindowId::new(window) else {
        return Ok(cx.boolean(false));
    };

    let tagged = match backend::tag_window(window, app_id) {
        Ok(_) => true,
        Err(err) => {
            warn!("cannot tag window {:#x}. err: {err:?}", window.get());
            false
        }
    };
    Ok(cx.boolean(tagged))
}

fn injection_hook_loaded(mut cx: FunctionContext) -> JsResult<JsBoolean> {
    Ok(cx.boolean(util::injection_hook_loaded()))
}

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[neon::main]
fn main(mut cx: ModuleContext) -> NeonResult<()> {
    setup_tracing();

    cx.export_function("createOverlay", create_overlay)?;
    cx.export_function("show", show)?;
    cx.export_function("hide", hide)?;
    cx.export_function("setFrame", set_frame)?;
    cx.export_function("renderFrame", render_frame)?;
    cx.export_function("setRoutingTarget", set_routing_target)?;
    cx.export_function("destroyOverlay", destroy_overlay)?;

    cx.export_function("setDebugLogging", set_debug_logging)?;
    cx.export_function("tagWindow", tag_window)?;
    cx.export_function("injectionHookLoaded", injection_hook_loaded)?;
    Ok(())
}
