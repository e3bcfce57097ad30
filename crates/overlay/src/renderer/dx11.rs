use core::{mem, ptr, slice};

use anyhow::Context;
use windows::{
    Win32::Graphics::{
        Direct3D::{
            D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP, ID3DBlob,
            Fxc::{D3DCOMPILE_OPTIMIZATION_LEVEL3, D3DCOMPILE_WARNINGS_ARE_ERRORS, D3DCompile},
        },
        Direct3D11::*,
        Dxgi::Common::{DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_FORMAT_R32G32_FLOAT, DXGI_SAMPLE_DESC},
    },
    core::{BOOL, PCSTR, s},
};

static TEXTURE_SHADER: &str = r"
struct VsOutput {
    float4 position : SV_POSITION;
    float2 uv : TEXCOORD0;
};

Texture2D tex : register(t0);
SamplerState samp : register(s0);

VsOutput vs_main(float2 pos : POSITION) {
    VsOutput output;
    output.position = float4(pos.x * 2.0 - 1.0, 1.0 - pos.y * 2.0, 0.0, 1.0);
    output.uv = pos;
    return output;
}

float4 ps_main(VsOutput input) : SV_TARGET {
    return tex.Sample(samp, input.uv);
}
";

#[derive(Clone, Copy)]
#[repr(C)]
struct Vertex {
    pub pos: (f32, f32),
}
type VertexArray = [Vertex; 4];
const VERTICES: VertexArray = [
    Vertex { pos: (0.0, 1.0) },
    Vertex { pos: (0.0, 0.0) },
    Vertex { pos: (1.0, 1.0) },
    Vertex { pos: (1.0, 0.0) },
];

const INPUT_DESC: [D3D11_INPUT_ELEMENT_DESC; 1] = [D3D11_INPUT_ELEMENT_DESC {
    SemanticName: s!("POSITION"),
    SemanticIndex: 0,
    Format: DXGI_FORMAT_R32G32_FLOAT,
    InputSlot: 0,
    AlignedByteOffset: 0,
    InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
    InstanceDataStepRate: 0,
}];

/// CPU writable BGRA frame texture.
pub struct Dx11Texture {
    size: (u32, u32),
    texture: ID3D11Texture2D,
    view: ID3D11ShaderResourceView,
}

impl Dx11Texture {
    pub fn new(device: &ID3D11Device, size: (u32, u32)) -> anyhow::Result<Self> {
        let mut texture = None;
        unsafe {
            device.CreateTexture2D(
                &D3D11_TEXTURE2D_DESC {
                    Width: size.0,
                    Height: size.1,
                    MipLevels: 1,
                    ArraySize: 1,
                    Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                    SampleDesc: DXGI_SAMPLE_DESC {
                        Count: 1,
                        Quality: 0,
                    },
                    Usage: D3D11_USAGE_DYNAMIC,
                    BindFlags: D3D11_BIND_SHADER_RESOURCE.0 as _,
                    CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as _,
                    MiscFlags: 0,
                },
                None,
                Some(&mut texture),
            )?;
        }
        let texture = texture.context("cannot create frame texture")?;

        let mut view = None;
        unsafe {
            device.CreateShaderResourceView(&texture, None, Some(&mut view))?;
        }
        let view = view.context("cannot create texture view")?;

        Ok(Self {
            size,
            texture,
            view,
        })
    }

    /// Copy tightly packed `pixels` row by row into the mapped texture.
    pub fn upload(&mut self, cx: &ID3D11DeviceContext, pixels: &[u8]) -> anyhow::Result<()> {
        let row_len = self.size.0 as usize * 4;
        debug_assert!(pixels.len() >= row_len * self.size.1 as usize);

        unsafe {
            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            cx.Map(
                &self.texture,
                0,
                D3D11_MAP_WRITE_DISCARD,
                0,
                Some(&mut mapped),
            )?;

            let dst = mapped.pData.cast::<u8>();
            for (y, row) in pixels.chunks_exact(row_len).take(self.size.1 as usize).enumerate() {
                ptr::copy_nonoverlapping(
                    row.as_ptr(),
                    dst.add(y * mapped.RowPitch as usize),
                    row_len,
                );
            }

            cx.Unmap(&self.texture, 0);
        }

        Ok(())
    }
}

/// Draws a texture over the whole render target.
pub struct Dx11Renderer {
    input_layout: ID3D11InputLayout,
    vertex_buffer: ID3D11Buffer,
    vertex_shader: ID3D11VertexShader,
    pixel_shader: ID3D11PixelShader,
    blend_state: ID3D11BlendState,
    sampler: ID3D11SamplerState,
}

impl Dx11Renderer {
    #[tracing::instrument]
    pub fn new(device: &ID3D11Device) -> anyhow::Result<Self> {
        unsafe {
            let vs_blob = compile(s!("vs_main"), s!("vs_5_0"))
                .context("vertex shader failed to build")?;
            let vs_blob = blob_bytes(&vs_blob);

            let mut input_layout = None;
            device.CreateInputLayout(&INPUT_DESC, vs_blob, Some(&mut input_layout))?;
            let input_layout = input_layout.context("failed to create input layout")?;

            let mut vertex_shader = None;
            device.CreateVertexShader(vs_blob, None, Some(&mut vertex_shader))?;
            let vertex_shader = vertex_shader.context("vertex shader failed to link")?;

            let ps_blob = compile(s!("ps_main"), s!("ps_5_0"))
                .context("pixel shader failed to build")?;

            let mut pixel_shader = None;
            device.CreatePixelShader(blob_bytes(&ps_blob), None, Some(&mut pixel_shader))?;
            let pixel_shader = pixel_shader.context("pixel shader failed to link")?;

            let mut vertex_buffer = None;
            device.CreateBuffer(
                &D3D11_BUFFER_DESC {
                    ByteWidth: mem::size_of::<VertexArray>() as _,
                    Usage: D3D11_USAGE_DEFAULT,
                    BindFlags: D3D11_BIND_VERTEX_BUFFER.0 as _,
                    CPUAccessFlags: 0,
                    MiscFlags: 0,
                    StructureByteStride: 0,
                },
                Some(&D3D11_SUBRESOURCE_DATA {
                    pSysMem: &VERTICES as *const _ as _,
                    SysMemPitch: 0,
                    SysMemSlicePitch: 0,
                }),
                Some(&mut vertex_buffer),
            )?;
            let vertex_buffer = vertex_buffer.context("cannot create vertex buffer")?;

            let mut blend_state = None;
            device.CreateBlendState(
                &D3D11_BLEND_DESC {
                    AlphaToCoverageEnable: BOOL(0),
                    IndependentBlendEnable: BOOL(0),
                    RenderTarget: [D3D11_RENDER_TARGET_BLEND_DESC {
                        BlendEnable: BOOL(1),
                        SrcBlend: D3D11_BLEND_SRC_ALPHA,
                        DestBlend: D3D11_BLEND_INV_SRC_ALPHA,
                        BlendOp: D3D11_BLEND_OP_ADD,
                        SrcBlendAlpha: D3D11_BLEND_ONE,
                        DestBlendAlpha: D3D11_BLEND_INV_SRC_ALPHA,
                        BlendOpAlpha: D3D11_BLEND_OP_ADD,
                        RenderTargetWriteMask: D3D11_COLOR_WRITE_ENABLE_ALL.0 as _,
                    }; 8],
                },
                Some(&mut blend_state),
            )?;
            let blend_state = blend_state.context("cannot create blend state")?;

            let mut sampler = None;
            device.CreateSamplerState(
                &D3D11_SAMPLER_DESC {
                    Filter: D3D11_FILTER_MIN_MAG_MIP_LINEAR,
                    AddressU: D3D11_TEXTURE_ADDRESS_CLAMP,
                    AddressV: D3D11_TEXTURE_ADDRESS_CLAMP,
                    AddressW: D3D11_TEXTURE_ADDRESS_CLAMP,
                    MaxLOD: f32::MAX,
                    ..Default::default()
                },
                Some(&mut sampler),
            )?;
            let sampler = sampler.context("cannot create sampler")?;

            Ok(Self {
                input_layout,
                vertex_buffer,
                vertex_shader,
                pixel_shader,
                blend_state,
                sampler,
            })
        }
    }

    /// Clear `target` to transparent and draw `texture` over it.
    #[tracing::instrument(skip_all)]
    pub fn draw(
        &self,
        cx: &ID3D11DeviceContext,
        target: &ID3D11RenderTargetView,
        screen: (u32, u32),
        texture: &Dx11Texture,
    ) {
        unsafe {
            cx.ClearRenderTargetView(target, &[0.0, 0.0, 0.0, 0.0]);

            cx.OMSetRenderTargets(Some(&[Some(target.clone())]), None);
            cx.OMSetBlendState(&self.blend_state, None, 0xffffffff);
            cx.RSSetViewports(Some(&[D3D11_VIEWPORT {
                TopLeftX: 0.0,
                TopLeftY: 0.0,
                Width: screen.0 as _,
                Height: screen.1 as _,
                MinDepth: 0.0,
                MaxDepth: 1.0,
            }]));

            cx.IASetInputLayout(&self.input_layout);
            cx.VSSetShader(&self.vertex_shader, None);
            cx.PSSetShader(&self.pixel_shader, None);

            cx.PSSetShaderResources(0, Some(&[Some(texture.view.clone())]));
            cx.PSSetSamplers(0, Some(&[Some(self.sampler.clone())]));

            cx.IASetVertexBuffers(
                0,
                1,
                Some(&Some(self.vertex_buffer.clone())),
                Some(&(mem::size_of::<Vertex>() as _)),
                Some(&0),
            );

            cx.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP);
            cx.Draw(4, 0);
        }
    }
}

unsafe fn compile(entry: PCSTR, target: PCSTR) -> anyhow::Result<ID3DBlob> {
    let mut blob = None;
    let mut errors = None;
    let res = unsafe {
        D3DCompile(
            TEXTURE_SHADER.as_ptr() as _,
            TEXTURE_SHADER.len(),
            None,
            None,
            None,
            entry,
            target,
            D3DCOMPILE_OPTIMIZATION_LEVEL3 | D3DCOMPILE_WARNINGS_ARE_ERRORS,
            0,
            &mut blob,
            Some(&mut errors),
        )
    };

    if let Err(err) = res {
        let message = errors
            .as_ref()
            .map(|errors| String::from_utf8_lossy(unsafe { blob_bytes(errors) }).into_owned())
            .unwrap_or_default();
        return Err(anyhow::Error::new(err).context(message));
    }

    blob.context("shader compiler returned no bytecode")
}

unsafe fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}
