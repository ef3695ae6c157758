//! WebGL2 sky behind the page.
//!
//! A single full-screen triangle is shaded with layered noise clouds. The
//! loop is driven by `requestAnimationFrame` and stops whenever the shared
//! [`PauseRegistry`] holds a token.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo::events::EventListener;
use gloo::render::{request_animation_frame, AnimationFrame};
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, MouseEvent, TouchEvent, WebGl2RenderingContext as GL, WebGlProgram,
    WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject, Window,
};

use crate::config::{ViewportClass, BREAKPOINT_PX};
use crate::error::SiteError;
use crate::pause::{Edge, PauseControl, PauseRegistry};
use crate::sky::{aspect_scale, pointer_uv, SkyClock, SkyConfig, SkyTuning, MOTION_FREEZE_TOKEN};

const VERTEX_SHADER: &str = r#"#version 300 es
const vec2 POS[3] = vec2[3](vec2(-1.0, -1.0), vec2(3.0, -1.0), vec2(-1.0, 3.0));
out vec2 vUv;
void main() {
    vec2 p = POS[gl_VertexID];
    vUv = p * 0.5 + 0.5;
    gl_Position = vec4(p, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;

uniform float uTime;
uniform vec2 uAspect;      // aspect_scale(): shorter side 1.0
uniform vec2 uMouse;
uniform float uCloudSpeed;
uniform float uCloudDensity;
uniform float uCloudScale;
uniform float uParallaxStrength;
uniform float uClearRadius;
uniform float uClearFeather;
uniform float uClearStrength;
uniform vec2 uClearEllipse;
uniform vec4 uBlob1;      // center.xy, radius, feather
uniform vec2 uBlob1Shape;
uniform vec4 uBlob2;
uniform vec2 uBlob2Shape;

in vec2 vUv;
out vec4 fragColor;

vec3 mod289(vec3 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec2 mod289(vec2 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec3 permute(vec3 x) { return mod289(((x * 34.0) + 1.0) * x); }

float snoise(vec2 v) {
    const vec4 C = vec4(0.211324865405187, 0.366025403784439, -0.577350269189626, 0.024390243902439);
    vec2 i = floor(v + dot(v, C.yy));
    vec2 x0 = v - i + dot(i, C.xx);
    vec2 i1 = (x0.x > x0.y) ? vec2(1.0, 0.0) : vec2(0.0, 1.0);
    vec4 x12 = x0.xyxy + C.xxzz;
    x12.xy -= i1;
    i = mod289(i);
    vec3 p = permute(permute(i.y + vec3(0.0, i1.y, 1.0)) + i.x + vec3(0.0, i1.x, 1.0));
    vec3 m = max(0.5 - vec3(dot(x0, x0), dot(x12.xy, x12.xy), dot(x12.zw, x12.zw)), 0.0);
    m = m * m;
    m = m * m;
    vec3 x = 2.0 * fract(p * C.www) - 1.0;
    vec3 h = abs(x) - 0.5;
    vec3 ox = floor(x + 0.5);
    vec3 a0 = x - ox;
    m *= 1.79284291400159 - 0.85373472095314 * (a0 * a0 + h * h);
    vec3 g;
    g.x = a0.x * x0.x + h.x * x0.y;
    g.yz = a0.yz * x12.xz + h.yz * x12.yw;
    return 130.0 * dot(m, g);
}

float fbm(vec2 p, float t) {
    float f = 0.0;
    float amplitude = 0.5;
    float frequency = 1.0;
    for (int i = 0; i < 6; i++) {
        vec2 offset = vec2(t * uCloudSpeed * 0.1, 0.0);
        f += amplitude * snoise((p + offset) * frequency * uCloudScale);
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    return f;
}

vec3 skyColor(vec2 uv) {
    float horizon = 1.0 - uv.y;
    return mix(vec3(0.227, 0.502, 0.769), vec3(0.627, 0.784, 0.922), horizon * horizon);
}

float blobMask(vec2 uv, vec4 blob, vec2 shape) {
    if (blob.z <= 0.0) return 0.0;
    vec2 d = (uv - blob.xy) / max(shape, vec2(0.001));
    return pow(smoothstep(blob.z, blob.z - blob.w, length(d)), 1.2);
}

void main() {
    vec2 st = vUv / uAspect;
    st += (uMouse - 0.5) * uParallaxStrength;

    float clouds = smoothstep(-uCloudDensity, uCloudDensity, fbm(st * 2.0, uTime));
    float layer1 = smoothstep(-0.3, 0.7, fbm(st * 1.5 + vec2(uTime * 0.01, 0.0), uTime)) * 0.8;
    float layer2 = smoothstep(-0.2, 0.5, fbm(st * 3.0 + vec2(uTime * 0.0075, 0.0), uTime)) * 0.6;
    float total = clamp(max(clouds, max(layer1 * 0.7, layer2 * 0.5)), 0.0, 1.0);

    vec2 c = (vUv - 0.5) / uClearEllipse;
    total *= 1.0 - smoothstep(uClearRadius, uClearRadius - uClearFeather, length(c)) * uClearStrength;
    total *= max(blobMask(vUv, uBlob1, uBlob1Shape), blobMask(vUv, uBlob2, uBlob2Shape));

    vec3 color = mix(skyColor(vUv), vec3(0.95), total * 0.8);
    color *= 1.0 - length(vUv - 0.5) * 0.3;
    fragColor = vec4(color, 1.0);
}
"#;

struct Uniforms {
    time: Option<WebGlUniformLocation>,
    aspect: Option<WebGlUniformLocation>,
    mouse: Option<WebGlUniformLocation>,
    cloud_speed: Option<WebGlUniformLocation>,
    cloud_density: Option<WebGlUniformLocation>,
    cloud_scale: Option<WebGlUniformLocation>,
    parallax: Option<WebGlUniformLocation>,
    clear_radius: Option<WebGlUniformLocation>,
    clear_feather: Option<WebGlUniformLocation>,
    clear_strength: Option<WebGlUniformLocation>,
    clear_ellipse: Option<WebGlUniformLocation>,
    blob1: Option<WebGlUniformLocation>,
    blob1_shape: Option<WebGlUniformLocation>,
    blob2: Option<WebGlUniformLocation>,
    blob2_shape: Option<WebGlUniformLocation>,
}

impl Uniforms {
    fn locate(gl: &GL, program: &WebGlProgram) -> Self {
        let at = |name: &str| gl.get_uniform_location(program, name);
        Self {
            time: at("uTime"),
            aspect: at("uAspect"),
            mouse: at("uMouse"),
            cloud_speed: at("uCloudSpeed"),
            cloud_density: at("uCloudDensity"),
            cloud_scale: at("uCloudScale"),
            parallax: at("uParallaxStrength"),
            clear_radius: at("uClearRadius"),
            clear_feather: at("uClearFeather"),
            clear_strength: at("uClearStrength"),
            clear_ellipse: at("uClearEllipse"),
            blob1: at("uBlob1"),
            blob1_shape: at("uBlob1Shape"),
            blob2: at("uBlob2"),
            blob2_shape: at("uBlob2Shape"),
        }
    }
}

struct Sky {
    window: Window,
    canvas: HtmlCanvasElement,
    gl: GL,
    // Kept alive for the lifetime of the context.
    _program: WebGlProgram,
    vao: Option<WebGlVertexArrayObject>,
    uniforms: Uniforms,
    config: SkyConfig,
    clock: SkyClock,
    mouse: (f32, f32),
    running: bool,
    frame: Option<AnimationFrame>,
}

type SharedSky = Rc<RefCell<Sky>>;

fn compile(gl: &GL, kind: u32, source: &str) -> Result<WebGlShader, SiteError> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| SiteError::Js("unable to create shader".into()))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    if gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        Err(SiteError::Js(gl.get_shader_info_log(&shader).unwrap_or_default()))
    }
}

fn link(gl: &GL) -> Result<WebGlProgram, SiteError> {
    let vertex = compile(gl, GL::VERTEX_SHADER, VERTEX_SHADER)?;
    let fragment = compile(gl, GL::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
    let program = gl
        .create_program()
        .ok_or_else(|| SiteError::Js("unable to create program".into()))?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);
    if gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        Err(SiteError::Js(gl.get_program_info_log(&program).unwrap_or_default()))
    }
}

impl Sky {
    fn viewport(&self) -> ViewportClass {
        let width = self
            .window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(BREAKPOINT_PX);
        ViewportClass::classify(width, BREAKPOINT_PX)
    }

    /// Matches the drawing buffer to the canvas' CSS size and re-applies the
    /// layout-dependent tuning.
    fn resize(&mut self) {
        let rect = self.canvas.get_bounding_client_rect();
        let ratio = self.window.device_pixel_ratio().min(2.0);
        let (w, h) = ((rect.width() * ratio) as u32, (rect.height() * ratio) as u32);
        self.canvas.set_width(w.max(1));
        self.canvas.set_height(h.max(1));
        self.gl.viewport(0, 0, w.max(1) as i32, h.max(1) as i32);

        let gl = &self.gl;
        let u = &self.uniforms;
        let (ax, ay) = aspect_scale(rect.width(), rect.height());
        gl.uniform2f(u.aspect.as_ref(), ax as f32, ay as f32);

        let tuning = SkyTuning::for_viewport(self.viewport(), &self.config);
        gl.uniform1f(u.cloud_density.as_ref(), tuning.cloud_density);
        gl.uniform1f(u.clear_radius.as_ref(), tuning.clear_radius);
        gl.uniform1f(u.clear_feather.as_ref(), tuning.clear_feather);
        gl.uniform1f(u.clear_strength.as_ref(), tuning.clear_strength);
        gl.uniform2f(u.clear_ellipse.as_ref(), tuning.clear_ellipse[0], tuning.clear_ellipse[1]);
        for (blob, (loc, shape)) in tuning
            .blobs
            .iter()
            .zip([(&u.blob1, &u.blob1_shape), (&u.blob2, &u.blob2_shape)])
        {
            gl.uniform4f(loc.as_ref(), blob.center[0], blob.center[1], blob.radius, blob.feather);
            gl.uniform2f(shape.as_ref(), blob.ellipse[0], blob.ellipse[1]);
        }
    }

    fn render(&mut self, advance: bool) {
        let time = self.clock.tick(advance, self.config.frame_step);
        let gl = &self.gl;
        gl.uniform1f(self.uniforms.time.as_ref(), time);
        gl.uniform2f(self.uniforms.mouse.as_ref(), self.mouse.0, self.mouse.1);
        gl.bind_vertex_array(self.vao.as_ref());
        gl.draw_arrays(GL::TRIANGLES, 0, 3);
    }

    fn pause(&mut self) {
        self.running = false;
        self.frame = None;
    }
}

fn schedule(sky: &SharedSky) {
    let weak = Rc::downgrade(sky);
    let frame = request_animation_frame(move |_| {
        if let Some(sky) = weak.upgrade() {
            tick(&sky);
        }
    });
    if let Ok(mut s) = sky.try_borrow_mut() {
        s.frame = Some(frame);
    }
}

fn tick(sky: &SharedSky) {
    {
        let Ok(mut s) = sky.try_borrow_mut() else {
            return;
        };
        if !s.running {
            return;
        }
        let advance = s.config.motion_enabled;
        s.render(advance);
    }
    schedule(sky);
}

/// Renders immediately, then continues on animation frames.
fn resume(sky: &SharedSky) {
    {
        let Ok(mut s) = sky.try_borrow_mut() else {
            log::warn!("sky busy; resume skipped");
            return;
        };
        if s.running {
            return;
        }
        s.running = true;
        let advance = s.config.motion_enabled;
        s.render(advance);
    }
    schedule(sky);
}

fn on_edge(weak: &Weak<RefCell<Sky>>, edge: Edge) {
    let Some(sky) = weak.upgrade() else {
        return;
    };
    match edge {
        Edge::Paused => {
            if let Ok(mut s) = sky.try_borrow_mut() {
                s.pause();
            }
        }
        Edge::Resumed => resume(&sky),
        Edge::Unchanged => {}
    }
}

/// Starts the sky on `canvas`, wiring it to `registry`.
pub fn start(
    window: &Window,
    canvas: HtmlCanvasElement,
    config: &SkyConfig,
    registry: &Rc<PauseRegistry>,
) -> Result<(), SiteError> {
    let gl: GL = canvas
        .get_context("webgl2")?
        .ok_or_else(|| SiteError::Js("WebGL2 not supported".into()))?
        .dyn_into()
        .map_err(|_| SiteError::Js("not a WebGL2 context".into()))?;

    let program = link(&gl)?;
    gl.use_program(Some(&program));
    let vao = gl.create_vertex_array();
    let uniforms = Uniforms::locate(&gl, &program);
    gl.uniform1f(uniforms.cloud_speed.as_ref(), config.cloud_speed);
    gl.uniform1f(uniforms.cloud_scale.as_ref(), config.cloud_scale);
    gl.uniform1f(uniforms.parallax.as_ref(), config.parallax_strength);

    let sky: SharedSky = Rc::new(RefCell::new(Sky {
        window: window.clone(),
        canvas,
        gl,
        _program: program,
        vao,
        uniforms,
        config: config.clone(),
        clock: SkyClock::default(),
        mouse: (0.5, 0.5),
        running: false,
        frame: None,
    }));

    {
        let mut s = sky.borrow_mut();
        s.resize();
        // One frame even when frozen, so the canvas is never blank.
        s.render(false);
    }

    let weak = Rc::downgrade(&sky);
    EventListener::new(window, "resize", move |_| {
        if let Some(sky) = weak.upgrade() {
            if let Ok(mut s) = sky.try_borrow_mut() {
                s.resize();
                // Resizing clears the drawing buffer.
                if !s.running {
                    s.render(false);
                }
            }
        }
    })
    .forget();

    let weak = Rc::downgrade(&sky);
    EventListener::new(window, "mousemove", move |event| {
        let (Some(sky), Some(mouse)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
            return;
        };
        if let Ok(mut s) = sky.try_borrow_mut() {
            let (w, h) = window_size(&s.window);
            s.mouse = pointer_uv(f64::from(mouse.client_x()), f64::from(mouse.client_y()), w, h);
        }
    })
    .forget();

    let weak = Rc::downgrade(&sky);
    EventListener::new(window, "touchmove", move |event| {
        let (Some(sky), Some(touch)) = (weak.upgrade(), event.dyn_ref::<TouchEvent>()) else {
            return;
        };
        let Some(first) = touch.touches().get(0) else {
            return;
        };
        if let Ok(mut s) = sky.try_borrow_mut() {
            let (w, h) = window_size(&s.window);
            s.mouse = pointer_uv(f64::from(first.client_x()), f64::from(first.client_y()), w, h);
        }
    })
    .forget();

    let weak = Rc::downgrade(&sky);
    registry.attach(move |edge| on_edge(&weak, edge));

    if !config.motion_enabled {
        registry.pause(MOTION_FREEZE_TOKEN);
    } else if !registry.is_paused() {
        resume(&sky);
    }
    log::info!(
        "sky started (motion {}, paused: {})",
        config.motion_enabled,
        registry.is_paused()
    );
    // Every callback above holds a weak reference; the sky lives as long as the page.
    std::mem::forget(sky);
    Ok(())
}

fn window_size(window: &Window) -> (f64, f64) {
    let dim = |v: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    (dim(window.inner_width()), dim(window.inner_height()))
}
